use std::time::Duration;
use voxmesh_client::{MeshEvent, NegotiationState};
use voxmesh_core::{ClientMessage, PeerId, RelayMessage, SignalPayload};

use super::{connect_over_endpoint, wait_for_peer};
use crate::integration::{WAIT_MS, init_tracing, wait_for_event};
use crate::utils::{AgentCall, MockAgentConfig, MockAgentFactory};

#[tokio::test]
async fn test_user_disconnected_while_offer_sent() {
    init_tracing();

    let (mut p, mut endpoint) = connect_over_endpoint("aa", MockAgentFactory::new()).await;
    p.session.join().await.expect("join");

    let zz = PeerId::from("zz");
    endpoint
        .outbound
        .send(RelayMessage::UserJoined { id: zz.clone() })
        .expect("link open");

    let handle = wait_for_peer(p.session.peers(), &zz).await.expect("aa initiates to zz");
    assert!(handle.wait_for_state(NegotiationState::OfferSent, Duration::from_millis(WAIT_MS)).await);

    let offer = tokio::time::timeout(Duration::from_millis(WAIT_MS), async {
        while let Some(msg) = endpoint.inbound.recv().await {
            if let ClientMessage::Signal { to, signal: SignalPayload::Offer { .. } } = msg {
                return Some(to);
            }
        }
        None
    })
    .await;
    assert_eq!(offer.ok().flatten(), Some(zz.clone()), "offer went out through the relay");

    endpoint
        .outbound
        .send(RelayMessage::UserDisconnected { id: zz.clone() })
        .expect("link open");

    let gone = zz.clone();
    let removed = wait_for_event(&mut p.events, |e| matches!(e, MeshEvent::PeerRemoved { peer_id } if *peer_id == gone)).await;
    assert!(removed.is_some());
    assert!(!p.session.peers().contains(&zz));
    assert_eq!(handle.state(), NegotiationState::Closed);

    let agent = p.factory.latest(&zz).await.expect("agent for zz");
    assert!(agent.is_closed());
}

#[tokio::test]
async fn test_user_disconnected_while_answering() {
    init_tracing();

    let factory = MockAgentFactory::with_config(MockAgentConfig {
        answer_delay: Some(Duration::from_secs(30)),
        ..Default::default()
    });
    let (mut p, mut endpoint) = connect_over_endpoint("zz", factory).await;
    p.session.join().await.expect("join");

    let aa = PeerId::from("aa");
    endpoint
        .outbound
        .send(RelayMessage::Signal {
            from: aa.clone(),
            signal: SignalPayload::Offer { sdp: "offer from aa".into() },
        })
        .expect("link open");

    let agent = p.factory.wait_for_agent(&aa, 1, WAIT_MS).await.expect("agent for aa");
    assert!(agent.wait_for_call(|c| *c == AgentCall::CreateAnswer, WAIT_MS).await);

    endpoint
        .outbound
        .send(RelayMessage::UserDisconnected { id: aa.clone() })
        .expect("link open");

    let gone = aa.clone();
    let removed = wait_for_event(&mut p.events, |e| matches!(e, MeshEvent::PeerRemoved { peer_id } if *peer_id == gone)).await;
    assert!(removed.is_some(), "removal does not wait for the pending answer");
    assert!(!p.session.peers().contains(&aa));
    assert!(agent.is_closed());

    while let Ok(msg) = endpoint.inbound.try_recv() {
        assert!(
            !matches!(msg, ClientMessage::Signal { signal: SignalPayload::Answer { .. }, .. }),
            "no answer after teardown"
        );
    }
}
