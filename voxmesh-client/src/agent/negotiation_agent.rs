use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use voxmesh_core::{IceCandidate, PeerId, SessionDescription};

use crate::agent::agent_event::AgentEventSender;
use crate::media::LocalAudioTrack;

/// The platform's connection-negotiation primitive for one remote peer.
///
/// Owned by exactly one peer entry. Any call may suspend.
#[async_trait]
pub trait NegotiationAgent: Send + Sync {
    async fn add_track(&self, track: Arc<LocalAudioTrack>) -> Result<()>;

    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// Release transport resources. Safe to call more than once.
    async fn close(&self) -> Result<()>;
}

/// Builds one agent per remote peer; `events` is that peer's queue.
#[async_trait]
pub trait AgentFactory: Send + Sync {
    async fn create(
        &self,
        peer_id: &PeerId,
        events: AgentEventSender,
    ) -> Result<Arc<dyn NegotiationAgent>>;
}
