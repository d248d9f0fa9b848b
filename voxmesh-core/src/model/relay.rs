use crate::model::peer::PeerId;
use crate::model::signaling::SignalPayload;
use serde::{Deserialize, Serialize};

/// Frames a participant sends to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Announce presence; the relay fans this out to everyone already joined.
    Join,
    Signal { to: PeerId, signal: SignalPayload },
}

/// Frames the relay delivers to a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "kebab-case")]
pub enum RelayMessage {
    /// First frame on every connection: the identity the relay assigned.
    Welcome { id: PeerId },
    /// Another participant sent `join`.
    UserJoined { id: PeerId },
    Signal { from: PeerId, signal: SignalPayload },
    UserDisconnected { id: PeerId },
}
