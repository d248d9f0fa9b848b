use std::time::Duration;
use voxmesh_client::{MeshConfig, NegotiationState, Role};
use voxmesh_core::{PeerId, SdpKind, SignalPayload};

use crate::integration::{WAIT_MS, create_test_set, init_tracing};
use crate::utils::{AgentCall, MockAgentConfig, MockAgentFactory};

#[tokio::test]
async fn test_responder_answers_offer() {
    init_tracing();

    let mut mesh = create_test_set("b", MockAgentFactory::new(), MeshConfig::default()).await;
    let a = PeerId::from("a");

    mesh.set.handle_signal(&a, SignalPayload::Offer { sdp: "offer from a".into() });
    let handle = mesh.set.get(&a).expect("offer creates an entry");
    assert_eq!(handle.role(), Role::Responder);

    let states = mesh.states_until(&a, NegotiationState::Established).await;
    assert_eq!(
        states,
        vec![
            NegotiationState::New,
            NegotiationState::OfferReceived,
            NegotiationState::AnswerSent,
            NegotiationState::Established
        ]
    );

    let answers = mesh.signaling.answers_to(&a).await;
    assert_eq!(answers.len(), 1);
    assert!(mesh.signaling.offers_to(&a).await.is_empty(), "responder never offers");

    let agent = mesh.factory.latest(&a).await.expect("agent for a");
    let calls = agent.calls().await;
    assert_eq!(
        calls[1],
        AgentCall::SetRemote {
            kind: SdpKind::Offer,
            sdp: "offer from a".into()
        }
    );
    assert_eq!(calls[2], AgentCall::CreateAnswer);
    assert_eq!(
        calls[3],
        AgentCall::SetLocal {
            kind: SdpKind::Answer,
            sdp: answers[0].clone()
        }
    );
}

#[tokio::test]
async fn test_local_candidates_are_trickled() {
    init_tracing();

    let factory = MockAgentFactory::with_config(MockAgentConfig {
        local_candidates: true,
        ..Default::default()
    });
    let mesh = create_test_set("b", factory, MeshConfig::default()).await;
    let a = PeerId::from("a");

    mesh.set.handle_signal(&a, SignalPayload::Offer { sdp: "offer from a".into() });

    let candidate = mesh.signaling.wait_for(&a, "candidate", WAIT_MS).await;
    assert!(matches!(candidate, Some(SignalPayload::Candidate(_))));

    let sent = mesh.signaling.sent().await;
    let answer_pos = sent.iter().position(|s| s.signal.kind() == "answer");
    let candidate_pos = sent.iter().position(|s| s.signal.kind() == "candidate");
    assert!(answer_pos < candidate_pos, "answer goes out before the first candidate");

    let handle = mesh.set.get(&a).expect("entry for a");
    assert!(handle.wait_for_state(NegotiationState::Established, Duration::from_millis(WAIT_MS)).await);
}
