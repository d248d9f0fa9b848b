use tokio::sync::mpsc;
use voxmesh_core::IceCandidate;

use crate::media::RemoteTrack;

/// Connectivity as reported by the agent's transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// What an agent reports back. Pushed onto the owning entry's queue instead of
/// running caller code inside the agent's callbacks.
#[derive(Debug)]
pub enum AgentEvent {
    /// A locally gathered candidate to trickle to the remote side.
    LocalCandidate(IceCandidate),

    InboundTrack(RemoteTrack),

    Connectivity(Connectivity),
}

pub type AgentEventSender = mpsc::UnboundedSender<AgentEvent>;
