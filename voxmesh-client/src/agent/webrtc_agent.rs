use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use voxmesh_core::{IceCandidate, IceServerConfig, PeerId, SdpKind, SessionDescription};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

use crate::agent::agent_event::{AgentEvent, AgentEventSender, Connectivity};
use crate::agent::negotiation_agent::{AgentFactory, NegotiationAgent};
use crate::config::MeshConfig;
use crate::media::{LocalAudioTrack, RemoteTrack};

/// Creates `webrtc` peer connections configured with the session's ICE servers.
pub struct WebRtcAgentFactory {
    ice_servers: Vec<IceServerConfig>,
}

impl WebRtcAgentFactory {
    pub fn new(config: &MeshConfig) -> Self {
        Self {
            ice_servers: config.ice_servers.clone(),
        }
    }
}

#[async_trait]
impl AgentFactory for WebRtcAgentFactory {
    async fn create(
        &self,
        peer_id: &PeerId,
        events: AgentEventSender,
    ) -> Result<Arc<dyn NegotiationAgent>> {
        let agent = WebRtcAgent::new(peer_id.clone(), &self.ice_servers, events).await?;
        Ok(Arc::new(agent))
    }
}

pub struct WebRtcAgent {
    peer_id: PeerId,
    peer_connection: Arc<RTCPeerConnection>,
}

impl WebRtcAgent {
    /// Build the peer connection and route its callbacks into `events`.
    pub async fn new(
        peer_id: PeerId,
        ice_servers: &[IceServerConfig],
        events: AgentEventSender,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = events.clone();
        let uid_state = peer_id.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let uid = uid_state.clone();

                Box::pin(async move {
                    info!("Peer connection state for {}: {:?}", uid, s);
                    let connectivity = match s {
                        RTCPeerConnectionState::Unspecified | RTCPeerConnectionState::New => {
                            Connectivity::New
                        }
                        RTCPeerConnectionState::Connecting => Connectivity::Connecting,
                        RTCPeerConnectionState::Connected => Connectivity::Connected,
                        RTCPeerConnectionState::Disconnected => Connectivity::Disconnected,
                        RTCPeerConnectionState::Failed => Connectivity::Failed,
                        RTCPeerConnectionState::Closed => Connectivity::Closed,
                    };
                    let _ = tx.send(AgentEvent::Connectivity(connectivity));
                })
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx.send(AgentEvent::LocalCandidate(IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                }));
            })
        }));

        let track_tx = events;
        let uid_track = peer_id.clone();
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                let uid = uid_track.clone();

                Box::pin(async move {
                    debug!("Inbound track {} from {}", track.id(), uid);
                    let _ = tx.send(AgentEvent::InboundTrack(RemoteTrack {
                        id: track.id(),
                        stream_id: track.stream_id(),
                        source: Some(track),
                    }));
                })
            },
        ));

        Ok(Self {
            peer_id,
            peer_connection,
        })
    }

    fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription> {
        let rtc = match desc.kind {
            SdpKind::Offer => RTCSessionDescription::offer(desc.sdp)?,
            SdpKind::Answer => RTCSessionDescription::answer(desc.sdp)?,
        };
        Ok(rtc)
    }
}

#[async_trait]
impl NegotiationAgent for WebRtcAgent {
    async fn add_track(&self, track: Arc<LocalAudioTrack>) -> Result<()> {
        let sender = self
            .peer_connection
            .add_track(track.rtp_track())
            .await
            .context("Failed to add local track")?;

        // RTCP has to be read for interceptors (NACK, reports) to run.
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while sender.read(&mut buf).await.is_ok() {}
        });

        debug!("Attached local track {} for {}", track.id(), self.peer_id);
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection.create_answer(None).await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_local_description(Self::to_rtc(desc)?)
            .await?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_remote_description(Self::to_rtc(desc)?)
            .await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .context("Failed to add ICE candidate")?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}
