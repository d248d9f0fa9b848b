mod agent_event;
mod negotiation_agent;
mod webrtc_agent;

pub use agent_event::*;
pub use negotiation_agent::*;
pub use webrtc_agent::*;
