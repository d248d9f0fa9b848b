use std::time::Duration;
use thiserror::Error;

use crate::peer::NegotiationState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("microphone access denied")]
    AccessDenied,

    #[error("no audio capture device available: {0}")]
    DeviceUnavailable(String),
}

/// Session-wide failures surfaced to the caller of `join`.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("signaling relay disconnected")]
    RelayDisconnected,

    #[error("relay sent no welcome within {0:?}")]
    HandshakeTimeout(Duration),

    #[error("unexpected first frame from relay: {0}")]
    Handshake(String),
}

/// A signal that does not fit the entry's negotiation state.
///
/// Scoped to one peer; recorded and recovered from, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("offer received while {state:?}; local side initiates this pairing, offer discarded")]
    GlareDiscarded { state: NegotiationState },

    #[error("offer received while {state:?}; local side answers this pairing, entry reset")]
    GlareReset { state: NegotiationState },

    #[error("offer already applied, duplicate delivery discarded")]
    DuplicateOffer,

    #[error("answer received while {state:?}, discarded")]
    UnexpectedAnswer { state: NegotiationState },

    #[error("{kind} received for a peer with no entry, discarded")]
    UnknownPeer { kind: &'static str },
}
