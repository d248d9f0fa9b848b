use clap::Parser;
use std::net::SocketAddr;

/// Command line / environment settings for the relay binary.
#[derive(Debug, Clone, Parser)]
#[command(name = "voxmesh-relay", about = "Signaling relay for voxmesh audio sessions")]
pub struct RelayConfig {
    /// Address the WebSocket endpoint listens on.
    #[arg(long, env = "VOXMESH_RELAY_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,
}
