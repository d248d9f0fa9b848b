use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use voxmesh_core::{ClientMessage, PeerId, RelayMessage, SignalPayload};

use crate::error::SessionError;
use crate::peer::PeerConnectionSet;
use crate::signaling::relay_link::RelayLink;
use crate::signaling::signaling_output::SignalingOutput;

/// This participant's connection to the relay.
///
/// Owns the outbound half of the link; the inbound half is handed back from
/// `connect` so the session can drive `dispatch` on its own task.
pub struct SignalingClient {
    local_id: PeerId,
    outbound: Mutex<Option<mpsc::UnboundedSender<ClientMessage>>>,
    joined: AtomicBool,
    closed: AtomicBool,
}

impl SignalingClient {
    /// Wait for the relay's `welcome` and adopt the identity it assigns.
    pub async fn connect(
        link: RelayLink,
        timeout: Duration,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<RelayMessage>), SessionError> {
        let RelayLink {
            outbound,
            mut inbound,
        } = link;

        let first = tokio::time::timeout(timeout, inbound.recv())
            .await
            .map_err(|_| SessionError::HandshakeTimeout(timeout))?;

        let local_id = match first {
            Some(RelayMessage::Welcome { id }) => id,
            Some(other) => return Err(SessionError::Handshake(format!("{:?}", other))),
            None => return Err(SessionError::RelayDisconnected),
        };
        info!("Relay assigned id {}", local_id);

        let client = Arc::new(Self {
            local_id,
            outbound: Mutex::new(Some(outbound)),
            joined: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        });
        Ok((client, inbound))
    }

    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    /// Announce presence to the relay. Only the first call sends `join`;
    /// returns whether this call did.
    pub async fn join(&self) -> Result<bool, SessionError> {
        let outbound = self.outbound.lock().await;
        let Some(tx) = outbound.as_ref() else {
            return Err(SessionError::RelayDisconnected);
        };
        if self.joined.swap(true, Ordering::SeqCst) {
            debug!("Already joined, not sending join again");
            return Ok(false);
        }
        if tx.send(ClientMessage::Join).is_err() {
            return Err(SessionError::RelayDisconnected);
        }
        info!("Sent join as {}", self.local_id);
        Ok(true)
    }

    pub fn has_joined(&self) -> bool {
        self.joined.load(Ordering::SeqCst)
    }

    pub async fn is_connected(&self) -> bool {
        self.outbound
            .lock()
            .await
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Drop the outbound half, which closes the relay connection. The relay
    /// then tells everyone else this participant left. Frames dispatched
    /// after this are ignored.
    pub async fn disconnect(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if self.outbound.lock().await.take().is_some() {
            info!("Disconnecting {} from relay", self.local_id);
        }
    }

    /// Apply one relay frame to the peer set.
    pub async fn dispatch(&self, msg: RelayMessage, peers: &PeerConnectionSet) {
        if self.closed.load(Ordering::SeqCst) {
            debug!("Disconnected, ignoring {:?}", msg);
            return;
        }
        match msg {
            RelayMessage::UserJoined { id } => {
                if id == self.local_id {
                    return;
                }
                info!("{} joined", id);
                peers.ensure_peer(&id);
            }

            RelayMessage::Signal { from, signal } => {
                peers.handle_signal(&from, signal);
            }

            RelayMessage::UserDisconnected { id } => {
                info!("{} disconnected", id);
                if let Some(slot) = peers.detach(&id) {
                    tokio::spawn(slot.shutdown());
                }
            }

            RelayMessage::Welcome { id } => {
                warn!("Ignoring repeated welcome (id {})", id);
            }
        }
    }
}

#[async_trait]
impl SignalingOutput for SignalingClient {
    async fn send_signal(&self, to: PeerId, signal: SignalPayload) {
        let outbound = self.outbound.lock().await;
        let Some(tx) = outbound.as_ref() else {
            debug!("Relay gone, dropping {} for {}", signal.kind(), to);
            return;
        };
        let kind = signal.kind();
        if tx.send(ClientMessage::Signal { to: to.clone(), signal }).is_err() {
            debug!("Relay gone, dropping {} for {}", kind, to);
        }
    }
}
