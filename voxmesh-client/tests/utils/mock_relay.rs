use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use voxmesh_client::RelayLink;
use voxmesh_core::{ClientMessage, PeerId, RelayMessage};

struct Connection {
    tx: mpsc::UnboundedSender<RelayMessage>,
    joined: bool,
}

#[derive(Default)]
struct RelayState {
    connections: HashMap<PeerId, Connection>,
    received: Vec<(PeerId, ClientMessage)>,
}

/// In-memory relay with the same fan-out rules as the real one. Ids are
/// handed out as `peer-1`, `peer-2`, ... so their order is predictable.
#[derive(Clone, Default)]
pub struct MockRelay {
    state: Arc<Mutex<RelayState>>,
    next_id: Arc<AtomicUsize>,
}

impl MockRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a link; the relay greets it with `welcome` right away.
    pub async fn connect(&self) -> (PeerId, RelayLink) {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = PeerId::from(format!("peer-{n}"));
        let (link, mut endpoint) = RelayLink::pair();

        let _ = endpoint.outbound.send(RelayMessage::Welcome { id: id.clone() });
        self.state.lock().await.connections.insert(
            id.clone(),
            Connection {
                tx: endpoint.outbound,
                joined: false,
            },
        );

        let relay = self.clone();
        let peer = id.clone();
        tokio::spawn(async move {
            while let Some(msg) = endpoint.inbound.recv().await {
                relay.handle(&peer, msg).await;
            }
            relay.disconnect(&peer).await;
        });

        (id, link)
    }

    /// Drop the relay side of `peer_id`'s connection, as a relay restart would.
    pub async fn kick(&self, peer_id: &PeerId) {
        self.disconnect(peer_id).await;
    }

    /// Frames the relay received from `peer_id`.
    pub async fn received_from(&self, peer_id: &PeerId) -> Vec<ClientMessage> {
        self.state
            .lock()
            .await
            .received
            .iter()
            .filter(|(from, _)| from == peer_id)
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    /// Wait until the relay has processed `join` from `peer_id`.
    pub async fn wait_until_joined(&self, peer_id: &PeerId, timeout_ms: u64) -> bool {
        let wait = async {
            loop {
                let joined = self
                    .state
                    .lock()
                    .await
                    .connections
                    .get(peer_id)
                    .is_some_and(|c| c.joined);
                if joined {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(Duration::from_millis(timeout_ms), wait)
            .await
            .is_ok()
    }

    pub async fn is_connected(&self, peer_id: &PeerId) -> bool {
        self.state.lock().await.connections.contains_key(peer_id)
    }

    async fn handle(&self, from: &PeerId, msg: ClientMessage) {
        let mut state = self.state.lock().await;
        state.received.push((from.clone(), msg.clone()));

        match msg {
            ClientMessage::Join => {
                let Some(conn) = state.connections.get_mut(from) else {
                    return;
                };
                if conn.joined {
                    return;
                }
                conn.joined = true;
                for (id, conn) in &state.connections {
                    if id != from && conn.joined {
                        let _ = conn.tx.send(RelayMessage::UserJoined { id: from.clone() });
                    }
                }
            }
            ClientMessage::Signal { to, signal } => {
                if let Some(conn) = state.connections.get(&to) {
                    let _ = conn.tx.send(RelayMessage::Signal {
                        from: from.clone(),
                        signal,
                    });
                }
            }
        }
    }

    async fn disconnect(&self, peer_id: &PeerId) {
        let mut state = self.state.lock().await;
        if state.connections.remove(peer_id).is_none() {
            return;
        }
        for conn in state.connections.values() {
            let _ = conn.tx.send(RelayMessage::UserDisconnected {
                id: peer_id.clone(),
            });
        }
    }
}
