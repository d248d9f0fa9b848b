use voxmesh_core::PeerId;

use crate::error::ProtocolViolation;
use crate::media::RemoteTrack;
use crate::peer::NegotiationState;

/// Everything the UI layer may want to reflect. The mesh never touches UI
/// surfaces itself.
#[derive(Debug, Clone)]
pub enum MeshEvent {
    PeerStateChanged {
        peer_id: PeerId,
        state: NegotiationState,
    },

    /// A remote participant's audio arrived; the subscriber creates the sink.
    RemoteTrack { peer_id: PeerId, track: RemoteTrack },

    ProtocolViolation {
        peer_id: PeerId,
        violation: ProtocolViolation,
    },

    /// The entry was closed and dropped from the set.
    PeerRemoved { peer_id: PeerId },

    RelayDisconnected,
}
