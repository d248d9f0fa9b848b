use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use voxmesh_core::{PeerId, SignalPayload};

use crate::agent::AgentFactory;
use crate::config::MeshConfig;
use crate::error::ProtocolViolation;
use crate::event::MeshEvent;
use crate::media::LocalMediaController;
use crate::peer::peer_connection_entry::{PeerConnectionEntry, PeerSlot};
use crate::peer::peer_handle::{PeerCommand, PeerHandle};
use crate::peer::peer_state::Role;
use crate::signaling::SignalingOutput;

/// Slots by peer id. Only the set holds it strongly; entries see it through a
/// `Weak`, so dropping the last set clone drops every slot and closes its entry.
pub(crate) type PeerMap = DashMap<PeerId, PeerSlot>;

/// Take the slot out of the map, but only if it still belongs to `instance`;
/// a replacement entry under the same id is left alone.
pub(crate) fn detach_instance(
    peers: &Weak<PeerMap>,
    peer_id: &PeerId,
    instance: u64,
) -> Option<PeerSlot> {
    peers
        .upgrade()?
        .remove_if(peer_id, |_, slot| slot.handle.instance() == instance)
        .map(|(_, slot)| slot)
}

/// Shared by the set and every entry task.
pub(crate) struct MeshContext {
    pub(crate) local_id: PeerId,
    pub(crate) config: MeshConfig,
    pub(crate) factory: Arc<dyn AgentFactory>,
    pub(crate) media: LocalMediaController,
    pub(crate) signaling: Arc<dyn SignalingOutput>,
    pub(crate) events: mpsc::UnboundedSender<MeshEvent>,
    next_instance: AtomicU64,
}

/// Every remote participant known to this session, keyed by id.
///
/// The map is only locked for lookup and insertion; each entry negotiates on
/// its own task, so one slow peer never stalls the others. Dropping the last
/// clone closes every entry.
#[derive(Clone)]
pub struct PeerConnectionSet {
    ctx: Arc<MeshContext>,
    peers: Arc<PeerMap>,
}

impl PeerConnectionSet {
    pub fn new(
        local_id: PeerId,
        config: MeshConfig,
        factory: Arc<dyn AgentFactory>,
        media: LocalMediaController,
        signaling: Arc<dyn SignalingOutput>,
        events: mpsc::UnboundedSender<MeshEvent>,
    ) -> Self {
        Self {
            ctx: Arc::new(MeshContext {
                local_id,
                config,
                factory,
                media,
                signaling,
                events,
                next_instance: AtomicU64::new(1),
            }),
            peers: Arc::new(DashMap::new()),
        }
    }

    pub fn local_id(&self) -> &PeerId {
        &self.ctx.local_id
    }

    fn spawn_entry(&self, peer_id: &PeerId, role: Role) -> PeerSlot {
        let instance = self.ctx.next_instance.fetch_add(1, Ordering::Relaxed);
        PeerConnectionEntry::spawn(
            self.ctx.clone(),
            Arc::downgrade(&self.peers),
            peer_id.clone(),
            role,
            instance,
        )
    }

    /// Get the entry for `peer_id`, creating it as Initiator if absent.
    ///
    /// A new entry starts its offer on its own task; this returns without
    /// waiting for it. Calling again for a known peer returns the same entry.
    pub fn ensure_peer(&self, peer_id: &PeerId) -> PeerHandle {
        match self.peers.entry(peer_id.clone()) {
            Entry::Occupied(slot) => slot.get().handle.clone(),
            Entry::Vacant(vacant) => {
                info!("New peer {}, initiating", peer_id);
                let slot = self.spawn_entry(peer_id, Role::Initiator);
                slot.handle.enqueue(PeerCommand::Initiate);
                let handle = slot.handle.clone();
                vacant.insert(slot);
                handle
            }
        }
    }

    /// Route a signal from `from` to its entry.
    ///
    /// An offer from an unknown peer creates a Responder entry. Answers and
    /// candidates for unknown peers are recorded and dropped.
    pub fn handle_signal(&self, from: &PeerId, signal: SignalPayload) {
        let handle = match self.peers.entry(from.clone()) {
            Entry::Occupied(slot) => slot.get().handle.clone(),
            Entry::Vacant(vacant) => {
                if !matches!(signal, SignalPayload::Offer { .. }) {
                    drop(vacant);
                    let violation = ProtocolViolation::UnknownPeer {
                        kind: signal.kind(),
                    };
                    warn!("Protocol violation from {}: {}", from, violation);
                    let _ = self.ctx.events.send(MeshEvent::ProtocolViolation {
                        peer_id: from.clone(),
                        violation,
                    });
                    return;
                }
                info!("Offer from new peer {}, responding", from);
                let slot = self.spawn_entry(from, Role::Responder);
                let handle = slot.handle.clone();
                vacant.insert(slot);
                handle
            }
        };

        debug!("Queueing {} from {}", signal.kind(), from);
        if !handle.enqueue(PeerCommand::Signal(signal)) {
            debug!("Entry for {} is closing, signal dropped", from);
        }
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<PeerHandle> {
        self.peers.get(peer_id).map(|slot| slot.handle.clone())
    }

    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.peers.contains_key(peer_id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.peers.iter().map(|e| e.key().clone()).collect()
    }

    /// Remove the entry from the map without waiting for it to close.
    pub(crate) fn detach(&self, peer_id: &PeerId) -> Option<PeerSlot> {
        self.peers.remove(peer_id).map(|(_, slot)| slot)
    }

    /// Close and drop the entry for `peer_id`. Removing an unknown peer is a
    /// no-op.
    pub async fn remove_peer(&self, peer_id: &PeerId) {
        match self.detach(peer_id) {
            Some(slot) => {
                info!("Removing peer {}", peer_id);
                slot.shutdown().await;
            }
            None => debug!("Peer {} already removed", peer_id),
        }
    }

    /// Close every entry and empty the set.
    pub async fn close_all(&self) {
        let ids = self.peer_ids();
        if !ids.is_empty() {
            info!("Closing {} peer(s)", ids.len());
        }
        let slots: Vec<PeerSlot> = ids.iter().filter_map(|id| self.detach(id)).collect();
        join_all(slots.into_iter().map(PeerSlot::shutdown)).await;
    }
}
