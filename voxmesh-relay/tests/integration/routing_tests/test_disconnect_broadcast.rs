use std::time::Duration;
use voxmesh_core::{ClientMessage, RelayMessage};

use crate::integration::init_tracing;
use crate::utils::{TestRelay, next_frame};

#[tokio::test]
async fn test_disconnect_broadcast() {
    init_tracing();

    let relay = TestRelay::start().await.expect("relay starts");
    let (a, link_a) = relay.connect().await.expect("a connects");
    let (_b, mut link_b) = relay.connect().await.expect("b connects");
    let (_c, mut link_c) = relay.connect().await.expect("c connects");

    link_a.outbound.send(ClientMessage::Join).unwrap();
    drop(link_a);

    assert_eq!(
        next_frame(&mut link_b).await,
        Some(RelayMessage::UserDisconnected { id: a.clone() })
    );
    assert_eq!(
        next_frame(&mut link_c).await,
        Some(RelayMessage::UserDisconnected { id: a })
    );

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while relay.service.peer_count() != 2 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(relay.service.peer_count(), 2);
    assert_eq!(relay.service.joined_count(), 0);
}
