use serde::Deserialize;
use std::time::Duration;
use voxmesh_core::IceServerConfig;
use voxmesh_core::utils::DEFAULT_STUN_ADDR;

/// Client-side settings for a mesh session.
///
/// Deserializable so an embedder can keep it next to its own settings;
/// every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// STUN/TURN servers handed to every negotiation agent.
    pub ice_servers: Vec<IceServerConfig>,

    /// How long to wait for the relay's `welcome` frame.
    pub handshake_timeout_ms: u64,

    /// Close entries that are not established within this window.
    /// `None` keeps an unanswered entry until its peer disconnects.
    pub negotiation_timeout_ms: Option<u64>,
}

impl MeshConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn negotiation_timeout(&self) -> Option<Duration> {
        self.negotiation_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::stun(DEFAULT_STUN_ADDR)],
            handshake_timeout_ms: 5_000,
            negotiation_timeout_ms: None,
        }
    }
}
