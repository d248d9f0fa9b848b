use voxmesh_client::{MediaError, SessionError, SessionState};
use voxmesh_core::ClientMessage;

use super::connect_participant;
use crate::integration::init_tracing;
use crate::utils::{MockMediaDevices, MockRelay};

#[tokio::test]
async fn test_media_denied_keeps_session_inactive() {
    init_tracing();

    let relay = MockRelay::new();
    let devices = MockMediaDevices::denying();
    let p = connect_participant(&relay, devices.clone()).await;

    let result = p.session.join().await;

    assert!(matches!(
        result,
        Err(SessionError::Media(MediaError::AccessDenied))
    ));
    assert_eq!(p.session.state(), SessionState::Inactive);
    assert_eq!(devices.requests(), 1);

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(
        !relay
            .received_from(&p.id)
            .await
            .contains(&ClientMessage::Join),
        "join must not reach the relay without media"
    );

    // Not retried on its own; a later join asks again.
    let _ = p.session.join().await;
    assert_eq!(devices.requests(), 2);
}
