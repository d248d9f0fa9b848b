use voxmesh_core::{ClientMessage, RelayMessage};

use crate::integration::init_tracing;
use crate::utils::{TestRelay, expect_silence, next_frame};

#[tokio::test]
async fn test_join_fanout() {
    init_tracing();

    let relay = TestRelay::start().await.expect("relay starts");
    let (a, mut link_a) = relay.connect().await.expect("a connects");
    let (b, mut link_b) = relay.connect().await.expect("b connects");
    assert_ne!(a, b, "each connection gets its own id");

    link_a.outbound.send(ClientMessage::Join).unwrap();
    assert!(expect_silence(&mut link_b).await, "b has not joined, hears nothing");

    link_b.outbound.send(ClientMessage::Join).unwrap();
    assert_eq!(next_frame(&mut link_a).await, Some(RelayMessage::UserJoined { id: b.clone() }));
    assert!(expect_silence(&mut link_b).await, "the joiner is not told about itself");

    link_b.outbound.send(ClientMessage::Join).unwrap();
    assert!(expect_silence(&mut link_a).await, "a second join is ignored");

    assert_eq!(relay.service.joined_count(), 2);
}
