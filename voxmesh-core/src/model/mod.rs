mod peer;
mod relay;
mod signaling;

pub use peer::PeerId;
pub use relay::{ClientMessage, RelayMessage};
pub use signaling::{IceCandidate, IceServerConfig, SdpKind, SessionDescription, SignalError, SignalPayload};
