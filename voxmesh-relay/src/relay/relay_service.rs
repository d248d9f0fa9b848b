use axum::extract::ws::Message;
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use voxmesh_core::{ClientMessage, PeerId, RelayMessage};

struct RelayInner {
    peers: DashMap<PeerId, mpsc::UnboundedSender<Message>>,
    joined: DashSet<PeerId>,
}

/// Routes frames between connected participants. Holds no negotiation state
/// of its own.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl RelayService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RelayInner {
                peers: DashMap::new(),
                joined: DashSet::new(),
            }),
        }
    }

    /// Register a new connection and greet it with its identity.
    pub fn connect(&self, tx: mpsc::UnboundedSender<Message>) -> PeerId {
        let peer_id = PeerId::new();
        self.inner.peers.insert(peer_id.clone(), tx);
        self.send(&peer_id, &RelayMessage::Welcome { id: peer_id.clone() });
        info!("Peer {} connected ({} online)", peer_id, self.peer_count());
        peer_id
    }

    /// Decode and route one text frame from `from`.
    pub fn handle_text(&self, from: &PeerId, text: &str) {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(msg) => self.handle_message(from, msg),
            Err(e) => warn!("Invalid frame from {}: {:?}", from, e),
        }
    }

    pub fn handle_message(&self, from: &PeerId, msg: ClientMessage) {
        match msg {
            ClientMessage::Join => {
                if !self.inner.joined.insert(from.clone()) {
                    debug!("Repeated join from {} ignored", from);
                    return;
                }
                info!("Peer {} joined ({} in session)", from, self.joined_count());
                let announce = RelayMessage::UserJoined { id: from.clone() };
                for peer in self.inner.joined.iter() {
                    if *peer != *from {
                        self.send(&peer, &announce);
                    }
                }
            }

            ClientMessage::Signal { to, signal } => {
                debug!("Relaying {} from {} to {}", signal.kind(), from, to);
                self.send(
                    &to,
                    &RelayMessage::Signal {
                        from: from.clone(),
                        signal,
                    },
                );
            }
        }
    }

    /// Forget `peer_id` and tell everyone else it left.
    pub fn disconnect(&self, peer_id: &PeerId) {
        if self.inner.peers.remove(peer_id).is_none() {
            return;
        }
        self.inner.joined.remove(peer_id);
        info!("Peer {} disconnected ({} online)", peer_id, self.peer_count());

        let gone = RelayMessage::UserDisconnected {
            id: peer_id.clone(),
        };
        let others: Vec<PeerId> = self.inner.peers.iter().map(|e| e.key().clone()).collect();
        for other in others {
            self.send(&other, &gone);
        }
    }

    pub fn peer_count(&self) -> usize {
        self.inner.peers.len()
    }

    pub fn joined_count(&self) -> usize {
        self.inner.joined.len()
    }

    fn send(&self, peer_id: &PeerId, msg: &RelayMessage) -> bool {
        let Some(peer) = self.inner.peers.get(peer_id) else {
            warn!("Attempted to send to disconnected peer {}", peer_id);
            return false;
        };
        match serde_json::to_string(msg) {
            Ok(json) => {
                if let Err(e) = peer.send(Message::Text(json.into())) {
                    error!("Failed to send WS message to {}: {:?}", peer_id, e);
                    return false;
                }
                true
            }
            Err(e) => {
                error!("Failed to serialize relay message: {}", e);
                false
            }
        }
    }
}

impl Default for RelayService {
    fn default() -> Self {
        Self::new()
    }
}
