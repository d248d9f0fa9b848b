use std::time::Duration;
use voxmesh_client::{MeshEvent, NegotiationState, SessionState};
use voxmesh_core::ClientMessage;

use super::{connect_participant, wait_for_peer};
use crate::integration::{WAIT_MS, init_tracing, wait_for_event};
use crate::utils::{MockMediaDevices, MockRelay};

#[tokio::test]
async fn test_join_is_sent_once() {
    init_tracing();

    let relay = MockRelay::new();
    let p = connect_participant(&relay, MockMediaDevices::granting()).await;

    p.session.join().await.expect("join");
    p.session.join().await.expect("second join is a no-op");

    tokio::time::sleep(Duration::from_millis(50)).await;
    let joins = relay
        .received_from(&p.id)
        .await
        .into_iter()
        .filter(|m| *m == ClientMessage::Join)
        .count();
    assert_eq!(joins, 1);
}

#[tokio::test]
async fn test_toggle_mute() {
    init_tracing();

    let relay = MockRelay::new();
    let p = connect_participant(&relay, MockMediaDevices::granting()).await;

    // Nothing to mute before joining.
    assert!(p.session.toggle_mute().await);
    assert!(p.session.media().tracks().await.is_empty());

    p.session.join().await.expect("join");
    assert!(p.session.media().is_muted().await, "joined muted");

    assert!(!p.session.toggle_mute().await);
    assert!(p.session.media().tracks().await.iter().all(|t| t.is_enabled()));

    assert!(p.session.toggle_mute().await);
    assert!(p.session.media().tracks().await.iter().all(|t| !t.is_enabled()));
}

#[tokio::test]
async fn test_leave_tears_down_both_sides() {
    init_tracing();

    let relay = MockRelay::new();
    let mut a = connect_participant(&relay, MockMediaDevices::granting()).await;
    let b = connect_participant(&relay, MockMediaDevices::granting()).await;

    a.session.join().await.expect("a joins");
    assert!(relay.wait_until_joined(&a.id, WAIT_MS).await);
    b.session.join().await.expect("b joins");

    let a_to_b = wait_for_peer(a.session.peers(), &b.id).await.expect("a sees b");
    let b_to_a = wait_for_peer(b.session.peers(), &a.id).await.expect("b sees a");
    assert!(a_to_b.wait_for_state(NegotiationState::Established, Duration::from_millis(WAIT_MS)).await);
    assert!(b_to_a.wait_for_state(NegotiationState::Established, Duration::from_millis(WAIT_MS)).await);

    b.session.leave().await;

    assert_eq!(b.session.state(), SessionState::Inactive);
    assert!(b.session.peers().is_empty());
    assert!(!b.session.media().has_stream().await);
    assert_eq!(b_to_a.state(), NegotiationState::Closed);

    let b_id = b.id.clone();
    let removed = wait_for_event(&mut a.events, |e| matches!(e, MeshEvent::PeerRemoved { peer_id } if *peer_id == b_id)).await;
    assert!(removed.is_some(), "a drops b after user-disconnected");
    assert!(!a.session.peers().contains(&b.id));

    let agent = a.factory.latest(&b.id).await.expect("a's agent for b");
    assert!(agent.is_closed());
    assert_eq!(a.session.state(), SessionState::Active, "a stays in the session");
}
