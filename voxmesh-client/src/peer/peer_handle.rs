use std::time::Duration;
use tokio::sync::{mpsc, watch};
use voxmesh_core::{PeerId, SignalPayload};

use crate::peer::peer_state::{NegotiationState, PeerStatus, Role};

/// Work queued for a peer entry, processed strictly in arrival order.
#[derive(Debug)]
pub(crate) enum PeerCommand {
    /// Start the Initiator path (no-op unless the entry is still `New`).
    Initiate,
    Signal(SignalPayload),
}

/// Cheap, cloneable view of one entry of the set.
///
/// Two handles with the same `instance` refer to the same entry and agent.
#[derive(Clone)]
pub struct PeerHandle {
    peer_id: PeerId,
    instance: u64,
    commands: mpsc::UnboundedSender<PeerCommand>,
    status: watch::Receiver<PeerStatus>,
}

impl PeerHandle {
    pub(crate) fn new(
        peer_id: PeerId,
        instance: u64,
        commands: mpsc::UnboundedSender<PeerCommand>,
        status: watch::Receiver<PeerStatus>,
    ) -> Self {
        Self {
            peer_id,
            instance,
            commands,
            status,
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn status(&self) -> PeerStatus {
        *self.status.borrow()
    }

    pub fn role(&self) -> Role {
        self.status().role
    }

    pub fn state(&self) -> NegotiationState {
        self.status().state
    }

    pub fn subscribe(&self) -> watch::Receiver<PeerStatus> {
        self.status.clone()
    }

    /// Wait until the entry reaches `target`. Returns `false` on timeout, or
    /// if the entry closed without ever reaching it.
    pub async fn wait_for_state(&self, target: NegotiationState, timeout: Duration) -> bool {
        let mut rx = self.status.clone();
        matches!(
            tokio::time::timeout(timeout, rx.wait_for(|s| s.state == target)).await,
            Ok(Ok(_))
        )
    }

    pub(crate) fn enqueue(&self, cmd: PeerCommand) -> bool {
        self.commands.send(cmd).is_ok()
    }
}

impl std::fmt::Debug for PeerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerHandle")
            .field("peer_id", &self.peer_id)
            .field("instance", &self.instance)
            .field("status", &self.status())
            .finish()
    }
}
