use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use webrtc::api::media_engine::MIME_TYPE_OPUS;
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

/// Outgoing Opus track shared by every connection of the session.
///
/// An RTP sender has no `enabled` switch, so a disabled track simply stops
/// forwarding samples; the remote side hears silence.
pub struct LocalAudioTrack {
    id: String,
    stream_id: String,
    enabled: AtomicBool,
    rtp: Arc<TrackLocalStaticSample>,
}

impl LocalAudioTrack {
    pub fn opus(id: impl Into<String>, stream_id: impl Into<String>) -> Self {
        let id = id.into();
        let stream_id = stream_id.into();
        let rtp = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48_000,
                channels: 2,
                ..Default::default()
            },
            id.clone(),
            stream_id.clone(),
        ));

        Self {
            id,
            stream_id,
            enabled: AtomicBool::new(true),
            rtp,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// The RTP side, for attaching to a peer connection.
    pub fn rtp_track(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        self.rtp.clone()
    }

    /// Push one encoded Opus frame. Returns `false` when the track is disabled
    /// and the frame was dropped.
    pub async fn write_sample(&self, sample: &Sample) -> Result<bool> {
        if !self.is_enabled() {
            return Ok(false);
        }
        self.rtp.write_sample(sample).await?;
        Ok(true)
    }
}

impl fmt::Debug for LocalAudioTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalAudioTrack")
            .field("id", &self.id)
            .field("stream_id", &self.stream_id)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// The captured local stream: a fixed set of audio tracks.
#[derive(Debug, Clone)]
pub struct MediaStream {
    pub id: String,
    pub tracks: Vec<Arc<LocalAudioTrack>>,
}

/// Inbound audio from a remote participant.
#[derive(Clone)]
pub struct RemoteTrack {
    pub id: String,
    pub stream_id: String,
    /// The RTP reader; absent for agents that are not backed by `webrtc`.
    pub source: Option<Arc<TrackRemote>>,
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("id", &self.id)
            .field("stream_id", &self.stream_id)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}
