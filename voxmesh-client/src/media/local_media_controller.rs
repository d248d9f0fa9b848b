use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::MediaError;
use crate::media::media_devices::MediaDevices;
use crate::media::track::{LocalAudioTrack, MediaStream};

struct MediaState {
    muted: bool,
    stream: Option<MediaStream>,
}

impl MediaState {
    fn apply_muted(&mut self, muted: bool) {
        if let Some(stream) = &self.stream {
            for track in &stream.tracks {
                track.set_enabled(!muted);
            }
        }
        self.muted = muted;
        info!("{}", if muted { "Microphone muted" } else { "Microphone live" });
    }
}

/// Owns the local capture stream and the session's single mute switch.
///
/// Cloning shares the same stream; every peer connection attaches the same
/// tracks, so muting here silences all of them at once.
#[derive(Clone)]
pub struct LocalMediaController {
    devices: Arc<dyn MediaDevices>,
    state: Arc<Mutex<MediaState>>,
}

impl LocalMediaController {
    pub fn new(devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            devices,
            state: Arc::new(Mutex::new(MediaState {
                muted: true,
                stream: None,
            })),
        }
    }

    /// Ask the platform for the microphone. The session always starts muted,
    /// whatever the previous mute state was.
    pub async fn acquire(&self) -> Result<MediaStream, MediaError> {
        self.state.lock().await.muted = true;

        let stream = self.devices.request_audio().await.map_err(|e| {
            warn!("Audio capture failed: {}", e);
            e
        })?;

        let mut state = self.state.lock().await;
        for track in &stream.tracks {
            track.set_enabled(false);
        }
        state.muted = true;
        state.stream = Some(stream.clone());

        info!(
            "Local stream {} acquired with {} track(s), muted",
            stream.id,
            stream.tracks.len()
        );
        Ok(stream)
    }

    /// Returns `false` when there is no stream yet; muting before joining is
    /// not an error.
    pub async fn set_muted(&self, muted: bool) -> bool {
        let mut state = self.state.lock().await;
        if state.stream.is_none() {
            debug!("set_muted({}) ignored, no local stream", muted);
            return false;
        }
        state.apply_muted(muted);
        true
    }

    /// Flip the mute flag under one lock, so concurrent toggles never read
    /// the same old value. Returns the resulting flag; without a stream
    /// nothing changes.
    pub async fn toggle(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.stream.is_none() {
            debug!("toggle ignored, no local stream");
            return state.muted;
        }
        let muted = !state.muted;
        state.apply_muted(muted);
        muted
    }

    pub async fn is_muted(&self) -> bool {
        self.state.lock().await.muted
    }

    pub async fn tracks(&self) -> Vec<Arc<LocalAudioTrack>> {
        self.state
            .lock()
            .await
            .stream
            .as_ref()
            .map(|s| s.tracks.clone())
            .unwrap_or_default()
    }

    pub async fn has_stream(&self) -> bool {
        self.state.lock().await.stream.is_some()
    }

    /// Drop the stream; tracks are disabled first so connections that still
    /// hold them go silent.
    pub async fn release(&self) {
        let mut state = self.state.lock().await;
        if let Some(stream) = state.stream.take() {
            for track in &stream.tracks {
                track.set_enabled(false);
            }
            info!("Local stream {} released", stream.id);
        }
        state.muted = true;
    }
}
