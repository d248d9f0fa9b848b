use async_trait::async_trait;
use voxmesh_core::{PeerId, SignalPayload};

/// Outbound half of signaling, implemented by whatever carries messages to
/// the relay. Sends must not wait for delivery.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    async fn send_signal(&self, to: PeerId, signal: SignalPayload);
}
