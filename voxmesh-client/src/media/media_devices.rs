use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::MediaError;
use crate::media::track::{LocalAudioTrack, MediaStream};

/// The platform's capture entry point (the permission prompt lives behind it).
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn request_audio(&self) -> Result<MediaStream, MediaError>;
}

/// Hands out a single Opus track that the embedder feeds with encoded frames
/// through [`LocalAudioTrack::write_sample`].
pub struct OpusCaptureDevice {
    refusal: Option<MediaError>,
}

impl OpusCaptureDevice {
    pub fn new() -> Self {
        Self { refusal: None }
    }

    /// A device whose every request fails with `error`, for hosts where
    /// capture was refused up front.
    pub fn refusing(error: MediaError) -> Self {
        Self {
            refusal: Some(error),
        }
    }
}

impl Default for OpusCaptureDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaDevices for OpusCaptureDevice {
    async fn request_audio(&self) -> Result<MediaStream, MediaError> {
        if let Some(error) = &self.refusal {
            return Err(error.clone());
        }

        let stream_id = Uuid::new_v4().to_string();
        let track = LocalAudioTrack::opus(format!("{stream_id}-audio"), stream_id.clone());
        info!("Opened Opus capture stream {}", stream_id);

        Ok(MediaStream {
            id: stream_id,
            tracks: vec![Arc::new(track)],
        })
    }
}
