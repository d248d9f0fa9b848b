use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use voxmesh_core::{IceCandidate, PeerId, SessionDescription, SignalPayload};

use crate::agent::{AgentEvent, Connectivity, NegotiationAgent};
use crate::error::ProtocolViolation;
use crate::event::MeshEvent;
use crate::peer::peer_connection_set::{detach_instance, MeshContext, PeerMap};
use crate::peer::peer_handle::{PeerCommand, PeerHandle};
use crate::peer::peer_state::{NegotiationState, PeerStatus, Role};

/// Why an entry stopped on its own, without being removed from outside.
enum ExitReason {
    CommandsClosed,
    AgentFailure(anyhow::Error),
    ConnectivityFailed,
    NegotiationTimeout(Duration),
}

/// What the set keeps per peer: the public handle plus the means to stop the
/// entry's task.
pub(crate) struct PeerSlot {
    pub(crate) handle: PeerHandle,
    close_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl PeerSlot {
    /// Stop the entry and wait until its agent is closed. In-flight agent work
    /// (offer/answer generation) is cancelled.
    pub(crate) async fn shutdown(self) {
        let _ = self.close_tx.send(());
        if let Err(e) = self.task.await {
            if e.is_panic() {
                error!("Peer task for {} panicked: {}", self.handle.peer_id(), e);
            }
        }
    }
}

/// One remote participant: its negotiation agent and negotiation state.
///
/// Owned by its own task, so signals for this peer are applied one at a time
/// in arrival order while other peers progress independently. Nothing else
/// holds the agent, and no lock is held across agent calls.
pub struct PeerConnectionEntry {
    peer_id: PeerId,
    instance: u64,
    role: Role,
    state: NegotiationState,

    agent: Option<Arc<dyn NegotiationAgent>>,
    agent_events: mpsc::UnboundedReceiver<AgentEvent>,
    commands: mpsc::UnboundedReceiver<PeerCommand>,

    /// Candidates that arrived before any remote description, in arrival order.
    pending_candidates: Vec<IceCandidate>,
    remote_description_applied: bool,
    last_remote_offer: Option<String>,
    /// When an unestablished negotiation gives up. Restarted whenever
    /// negotiation starts over, cleared once established.
    deadline: watch::Sender<Option<Instant>>,

    status_tx: watch::Sender<PeerStatus>,
    ctx: Arc<MeshContext>,
    peers: Weak<PeerMap>,
}

impl PeerConnectionEntry {
    pub(crate) fn spawn(
        ctx: Arc<MeshContext>,
        peers: Weak<PeerMap>,
        peer_id: PeerId,
        role: Role,
        instance: u64,
    ) -> PeerSlot {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = oneshot::channel();
        let initial = PeerStatus {
            role,
            state: NegotiationState::New,
        };
        let (status_tx, status_rx) = watch::channel(initial);
        let (_, agent_events) = mpsc::unbounded_channel();

        let entry = PeerConnectionEntry {
            peer_id: peer_id.clone(),
            instance,
            role,
            state: NegotiationState::New,
            agent: None,
            agent_events,
            commands: cmd_rx,
            pending_candidates: Vec::new(),
            remote_description_applied: false,
            last_remote_offer: None,
            deadline: watch::Sender::new(None),
            status_tx,
            ctx,
            peers,
        };

        let task = tokio::spawn(entry.run(close_rx));

        PeerSlot {
            handle: PeerHandle::new(peer_id, instance, cmd_tx, status_rx),
            close_tx,
            task,
        }
    }

    async fn run(mut self, mut close_rx: oneshot::Receiver<()>) {
        info!(
            "Peer entry {} (#{}) created as {:?}",
            self.peer_id, self.instance, self.role
        );
        self.publish();

        let exit = tokio::select! {
            _ = &mut close_rx => None,
            reason = self.process() => Some(reason),
        };

        if let Some(reason) = exit {
            match &reason {
                ExitReason::CommandsClosed => debug!("Command queue for {} closed", self.peer_id),
                ExitReason::AgentFailure(e) => {
                    error!("Negotiation agent for {} failed: {:#}", self.peer_id, e)
                }
                ExitReason::ConnectivityFailed => {
                    warn!("Connectivity to {} failed, dropping peer", self.peer_id)
                }
                ExitReason::NegotiationTimeout(t) => warn!(
                    "Negotiation with {} not established after {:?}, dropping peer",
                    self.peer_id, t
                ),
            }
            detach_instance(&self.peers, &self.peer_id, self.instance);
        }

        self.shutdown().await;
    }

    async fn process(&mut self) -> ExitReason {
        if let Err(e) = self.install_agent().await {
            return ExitReason::AgentFailure(e);
        }

        self.arm_deadline();
        let expired = deadline_expired(self.deadline.subscribe());
        tokio::pin!(expired);
        let timeout = self.ctx.config.negotiation_timeout().unwrap_or_default();

        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    let Some(cmd) = cmd else {
                        return ExitReason::CommandsClosed;
                    };
                    // Agent work counts against the deadline too.
                    tokio::select! {
                        result = self.handle_command(cmd) => {
                            if let Err(e) = result {
                                return ExitReason::AgentFailure(e);
                            }
                        }
                        _ = &mut expired => return ExitReason::NegotiationTimeout(timeout),
                    }
                }

                Some(event) = self.agent_events.recv() => {
                    if let Some(reason) = self.handle_agent_event(event).await {
                        return reason;
                    }
                }

                _ = &mut expired => return ExitReason::NegotiationTimeout(timeout),
            }
        }
    }

    fn arm_deadline(&self) {
        let at = self
            .ctx
            .config
            .negotiation_timeout()
            .map(|t| Instant::now() + t);
        self.deadline.send_replace(at);
    }

    /// Create a fresh agent with its own event queue and attach every current
    /// local track to it.
    async fn install_agent(&mut self) -> anyhow::Result<()> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let agent = self.ctx.factory.create(&self.peer_id, events_tx).await?;
        self.agent_events = events_rx;
        self.agent = Some(agent.clone());

        let tracks = self.ctx.media.tracks().await;
        for track in tracks {
            debug!(
                "Attaching local track {} (enabled: {}) to {}",
                track.id(),
                track.is_enabled(),
                self.peer_id
            );
            agent.add_track(track).await?;
        }
        Ok(())
    }

    fn agent(&self) -> anyhow::Result<Arc<dyn NegotiationAgent>> {
        self.agent
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no negotiation agent for {}", self.peer_id))
    }

    async fn handle_command(&mut self, cmd: PeerCommand) -> anyhow::Result<()> {
        match cmd {
            PeerCommand::Initiate => self.start_offer().await,
            PeerCommand::Signal(SignalPayload::Offer { sdp }) => self.on_offer(sdp).await,
            PeerCommand::Signal(SignalPayload::Answer { sdp }) => self.on_answer(sdp).await,
            PeerCommand::Signal(SignalPayload::Candidate(candidate)) => {
                self.on_candidate(candidate).await;
                Ok(())
            }
        }
    }

    async fn start_offer(&mut self) -> anyhow::Result<()> {
        if self.state != NegotiationState::New {
            debug!(
                "Not initiating towards {}, already {:?}",
                self.peer_id, self.state
            );
            return Ok(());
        }

        let agent = self.agent()?;
        let offer = agent.create_offer().await?;
        agent.set_local_description(offer.clone()).await?;
        self.set_state(NegotiationState::OfferSent);

        info!("Sending offer to {}", self.peer_id);
        self.ctx
            .signaling
            .send_signal(self.peer_id.clone(), offer.into())
            .await;
        Ok(())
    }

    async fn on_offer(&mut self, sdp: String) -> anyhow::Result<()> {
        match self.state {
            NegotiationState::New => {}
            NegotiationState::Closed => return Ok(()),
            state => {
                if self.last_remote_offer.as_deref() == Some(sdp.as_str()) {
                    self.record(ProtocolViolation::DuplicateOffer);
                    return Ok(());
                }
                if Role::for_pair(&self.ctx.local_id, &self.peer_id) == Role::Initiator {
                    self.record(ProtocolViolation::GlareDiscarded { state });
                    return Ok(());
                }
                self.record(ProtocolViolation::GlareReset { state });
                self.reset().await?;
            }
        }

        info!("Received offer from {}", self.peer_id);
        self.role = Role::Responder;

        let agent = self.agent()?;
        agent
            .set_remote_description(SessionDescription::offer(sdp.clone()))
            .await?;
        self.last_remote_offer = Some(sdp);
        self.set_state(NegotiationState::OfferReceived);
        self.flush_candidates().await;

        let answer = agent.create_answer().await?;
        agent.set_local_description(answer.clone()).await?;
        self.set_state(NegotiationState::AnswerSent);

        info!("Sending answer to {}", self.peer_id);
        self.ctx
            .signaling
            .send_signal(self.peer_id.clone(), answer.into())
            .await;
        self.set_state(NegotiationState::Established);
        Ok(())
    }

    async fn on_answer(&mut self, sdp: String) -> anyhow::Result<()> {
        if self.state != NegotiationState::OfferSent {
            self.record(ProtocolViolation::UnexpectedAnswer { state: self.state });
            return Ok(());
        }

        info!("Received answer from {}", self.peer_id);
        self.agent()?
            .set_remote_description(SessionDescription::answer(sdp))
            .await?;
        self.flush_candidates().await;
        self.set_state(NegotiationState::Established);
        Ok(())
    }

    async fn on_candidate(&mut self, candidate: IceCandidate) {
        if !self.remote_description_applied {
            debug!(
                "Buffering ICE candidate from {} ({} pending)",
                self.peer_id,
                self.pending_candidates.len() + 1
            );
            self.pending_candidates.push(candidate);
            return;
        }
        self.apply_candidate(candidate).await;
    }

    async fn flush_candidates(&mut self) {
        self.remote_description_applied = true;
        let pending = std::mem::take(&mut self.pending_candidates);
        if !pending.is_empty() {
            debug!(
                "Applying {} buffered ICE candidate(s) for {}",
                pending.len(),
                self.peer_id
            );
        }
        for candidate in pending {
            self.apply_candidate(candidate).await;
        }
    }

    async fn apply_candidate(&self, candidate: IceCandidate) {
        let Some(agent) = &self.agent else { return };
        match agent.add_ice_candidate(candidate).await {
            Ok(()) => debug!("Added ICE candidate from {}", self.peer_id),
            Err(e) => warn!("Failed to add ICE candidate for {}: {:?}", self.peer_id, e),
        }
    }

    /// Throw away the current negotiation and start over with a fresh agent.
    /// Buffered remote candidates are kept: they belong to the remote side's
    /// connection, which is the one now offering.
    async fn reset(&mut self) -> anyhow::Result<()> {
        if let Some(old) = self.agent.clone() {
            if let Err(e) = old.close().await {
                warn!("Failed to close replaced agent for {}: {:?}", self.peer_id, e);
            }
        }
        self.agent = None;
        self.remote_description_applied = false;
        self.set_state(NegotiationState::New);
        self.arm_deadline();
        self.install_agent().await
    }

    async fn handle_agent_event(&mut self, event: AgentEvent) -> Option<ExitReason> {
        match event {
            AgentEvent::LocalCandidate(candidate) => {
                debug!("Sending ICE candidate to {}", self.peer_id);
                self.ctx
                    .signaling
                    .send_signal(self.peer_id.clone(), SignalPayload::Candidate(candidate))
                    .await;
            }

            AgentEvent::InboundTrack(track) => {
                info!("Received remote track {} from {}", track.id, self.peer_id);
                let _ = self.ctx.events.send(MeshEvent::RemoteTrack {
                    peer_id: self.peer_id.clone(),
                    track,
                });
            }

            AgentEvent::Connectivity(Connectivity::Failed) => {
                return Some(ExitReason::ConnectivityFailed);
            }

            AgentEvent::Connectivity(connectivity) => {
                debug!("Connectivity to {}: {:?}", self.peer_id, connectivity);
            }
        }
        None
    }

    async fn shutdown(&mut self) {
        if let Some(agent) = self.agent.take() {
            if let Err(e) = agent.close().await {
                warn!("Failed to close agent for {}: {:?}", self.peer_id, e);
            }
        }
        self.pending_candidates.clear();
        self.set_state(NegotiationState::Closed);

        info!("Peer entry {} (#{}) closed", self.peer_id, self.instance);
        let _ = self.ctx.events.send(MeshEvent::PeerRemoved {
            peer_id: self.peer_id.clone(),
        });
    }

    fn set_state(&mut self, state: NegotiationState) {
        if self.state == state {
            return;
        }
        debug!("{}: {:?} -> {:?}", self.peer_id, self.state, state);
        self.state = state;
        if state == NegotiationState::Established {
            self.deadline.send_replace(None);
        }
        self.publish();
    }

    fn publish(&self) {
        self.status_tx.send_replace(PeerStatus {
            role: self.role,
            state: self.state,
        });
        let _ = self.ctx.events.send(MeshEvent::PeerStateChanged {
            peer_id: self.peer_id.clone(),
            state: self.state,
        });
    }

    fn record(&self, violation: ProtocolViolation) {
        warn!("Protocol violation from {}: {}", self.peer_id, violation);
        let _ = self.ctx.events.send(MeshEvent::ProtocolViolation {
            peer_id: self.peer_id.clone(),
            violation,
        });
    }
}

/// Resolves once the current deadline passes. Follows every change to it;
/// never resolves while there is none.
async fn deadline_expired(mut deadline: watch::Receiver<Option<Instant>>) {
    loop {
        let current = *deadline.borrow_and_update();
        let wait = async {
            match current {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            _ = wait => return,
            changed = deadline.changed() => {
                if changed.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        }
    }
}
