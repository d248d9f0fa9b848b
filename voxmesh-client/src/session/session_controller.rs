use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use voxmesh_core::{PeerId, RelayMessage};

use crate::agent::AgentFactory;
use crate::config::MeshConfig;
use crate::error::SessionError;
use crate::event::MeshEvent;
use crate::media::{LocalMediaController, MediaDevices};
use crate::peer::PeerConnectionSet;
use crate::signaling::{RelayLink, SignalingClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Inactive,
    Active,
}

/// Top-level orchestration of one participant: media, relay and peers.
///
/// A session is one relay connection. `leave` ends it; joining again needs a
/// new controller.
pub struct SessionController {
    media: LocalMediaController,
    signaling: Arc<SignalingClient>,
    peers: PeerConnectionSet,
    state: Arc<watch::Sender<SessionState>>,
    lifecycle: Mutex<()>,
    dispatch: Mutex<Option<JoinHandle<()>>>,
}

impl SessionController {
    /// Complete the relay handshake and start processing relay frames.
    ///
    /// The returned receiver carries every [`MeshEvent`] of the session.
    pub async fn new(
        config: MeshConfig,
        link: RelayLink,
        devices: Arc<dyn MediaDevices>,
        factory: Arc<dyn AgentFactory>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<MeshEvent>), SessionError> {
        let (signaling, inbound) =
            SignalingClient::connect(link, config.handshake_timeout()).await?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let media = LocalMediaController::new(devices);
        let peers = PeerConnectionSet::new(
            signaling.local_id().clone(),
            config,
            factory,
            media.clone(),
            signaling.clone(),
            events_tx.clone(),
        );
        let state = Arc::new(watch::Sender::new(SessionState::Inactive));

        let dispatch = tokio::spawn(dispatch_loop(
            inbound,
            signaling.clone(),
            peers.clone(),
            media.clone(),
            state.clone(),
            events_tx,
        ));

        let controller = Self {
            media,
            signaling,
            peers,
            state,
            lifecycle: Mutex::new(()),
            dispatch: Mutex::new(Some(dispatch)),
        };
        Ok((controller, events_rx))
    }

    /// Acquire the microphone, then announce presence to the relay.
    ///
    /// If the microphone is refused nothing is sent and the session stays
    /// inactive.
    pub async fn join(&self) -> Result<(), SessionError> {
        let _guard = self.lifecycle.lock().await;

        if self.state() == SessionState::Active {
            return Ok(());
        }
        if !self.signaling.is_connected().await {
            return Err(SessionError::RelayDisconnected);
        }

        self.media.acquire().await?;

        if let Err(e) = self.signaling.join().await {
            self.media.release().await;
            return Err(e);
        }

        self.state.send_replace(SessionState::Active);
        info!("Session {} active", self.local_id());
        Ok(())
    }

    /// Disconnect from the relay, then close every peer and release the
    /// microphone.
    ///
    /// Relay frames stop being dispatched before any peer is closed, so a
    /// late offer cannot bring a peer back.
    pub async fn leave(&self) {
        let _guard = self.lifecycle.lock().await;

        self.signaling.disconnect().await;
        if let Some(dispatch) = self.dispatch.lock().await.take() {
            dispatch.abort();
            let _ = dispatch.await;
        }
        self.peers.close_all().await;
        self.media.release().await;
        self.state.send_replace(SessionState::Inactive);
        info!("Session {} left", self.local_id());
    }

    /// Flip the microphone. Returns the resulting muted flag; without a
    /// stream this changes nothing.
    pub async fn toggle_mute(&self) -> bool {
        self.media.toggle().await
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn local_id(&self) -> &PeerId {
        self.signaling.local_id()
    }

    pub fn peers(&self) -> &PeerConnectionSet {
        &self.peers
    }

    pub fn media(&self) -> &LocalMediaController {
        &self.media
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(dispatch) = self.dispatch.get_mut().take() {
            dispatch.abort();
        }
    }
}

async fn dispatch_loop(
    mut inbound: mpsc::UnboundedReceiver<RelayMessage>,
    signaling: Arc<SignalingClient>,
    peers: PeerConnectionSet,
    media: LocalMediaController,
    state: Arc<watch::Sender<SessionState>>,
    events: mpsc::UnboundedSender<MeshEvent>,
) {
    while let Some(msg) = inbound.recv().await {
        signaling.dispatch(msg, &peers).await;
    }

    if signaling.is_connected().await {
        error!("Relay connection lost");
    } else {
        info!("Relay connection closed");
    }

    signaling.disconnect().await;
    peers.close_all().await;
    media.release().await;
    if state.send_replace(SessionState::Inactive) == SessionState::Active {
        warn!("Session {} deactivated", signaling.local_id());
    }
    let _ = events.send(MeshEvent::RelayDisconnected);
}
