use voxmesh_core::PeerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

impl Role {
    /// Tie-break for crossed offers: the lower id initiates the pairing.
    pub fn for_pair(local: &PeerId, remote: &PeerId) -> Role {
        if local < remote {
            Role::Initiator
        } else {
            Role::Responder
        }
    }
}

/// Per-entry negotiation progress.
///
/// Initiator: `New -> OfferSent -> Established`.
/// Responder: `New -> OfferReceived -> AnswerSent -> Established`.
/// Any state may move to `Closed`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    New,
    OfferSent,
    OfferReceived,
    AnswerSent,
    Established,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerStatus {
    pub role: Role,
    pub state: NegotiationState,
}
