mod peer_connection_entry;
mod peer_connection_set;
mod peer_handle;
mod peer_state;

pub use peer_connection_entry::*;
pub use peer_connection_set::*;
pub use peer_handle::*;
pub use peer_state::*;
