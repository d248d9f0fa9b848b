use std::time::Duration;
use voxmesh_client::{MeshEvent, NegotiationState};

use super::{connect_participant, wait_for_peer};
use crate::integration::{WAIT_MS, eventually, init_tracing, wait_for_event};
use crate::utils::{MockMediaDevices, MockRelay};

#[tokio::test]
async fn test_dropping_session_closes_its_peers() {
    init_tracing();

    let relay = MockRelay::new();
    let a = connect_participant(&relay, MockMediaDevices::granting()).await;
    let mut b = connect_participant(&relay, MockMediaDevices::granting()).await;

    a.session.join().await.expect("a joins");
    assert!(relay.wait_until_joined(&a.id, WAIT_MS).await);
    b.session.join().await.expect("b joins");

    let a_to_b = wait_for_peer(a.session.peers(), &b.id).await.expect("a sees b");
    assert!(a_to_b.wait_for_state(NegotiationState::Established, Duration::from_millis(WAIT_MS)).await);
    let agent = a.factory.latest(&b.id).await.expect("a's agent for b");

    drop(a.session);

    assert!(eventually(|| agent.is_closed()).await, "dropped session must close its agents");
    assert!(a_to_b.wait_for_state(NegotiationState::Closed, Duration::from_millis(WAIT_MS)).await);

    // The relay link goes with the session, so b hears about it.
    let a_id = a.id.clone();
    let removed = wait_for_event(&mut b.events, |e| matches!(e, MeshEvent::PeerRemoved { peer_id } if *peer_id == a_id)).await;
    assert!(removed.is_some());
    assert!(!relay.is_connected(&a.id).await);
}
