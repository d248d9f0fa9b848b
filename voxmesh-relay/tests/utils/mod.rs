
pub use test_relay::*;
