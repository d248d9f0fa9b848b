mod local_media_controller;
mod media_devices;
mod track;

pub use local_media_controller::*;
pub use media_devices::*;
pub use track::*;
