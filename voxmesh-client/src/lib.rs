mod agent;
mod config;
mod error;
mod event;
mod media;
mod peer;
mod session;
mod signaling;

pub use agent::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use media::*;
pub use peer::*;
pub use session::*;
pub use signaling::*;
