mod relay_link;
mod signaling_client;
mod signaling_output;

pub use relay_link::*;
pub use signaling_client::*;
pub use signaling_output::*;
