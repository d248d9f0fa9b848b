use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpKind {
    Offer,
    Answer,
}

/// One half of an offer/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Trickle ICE candidate in the browser's `RTCIceCandidateInit` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
            username_fragment: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("unsupported session description type `{0}`")]
    UnsupportedType(String),

    #[error("`{0}` description carries no sdp")]
    MissingSdp(String),

    #[error("payload is neither a session description nor an ICE candidate")]
    Unrecognized,
}

/// Payload carried by a `signal` relay message.
///
/// On the wire this is whatever the browser produced: a session description
/// (`{"type": "offer" | "answer", "sdp": ..}`) or a bare candidate object with
/// no `type`. The variant is decided once, here, when the payload is decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSignal", into = "RawSignal")]
pub enum SignalPayload {
    Offer { sdp: String },
    Answer { sdp: String },
    Candidate(IceCandidate),
}

impl SignalPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            SignalPayload::Offer { .. } => "offer",
            SignalPayload::Answer { .. } => "answer",
            SignalPayload::Candidate(_) => "candidate",
        }
    }
}

impl From<SessionDescription> for SignalPayload {
    fn from(desc: SessionDescription) -> Self {
        match desc.kind {
            SdpKind::Offer => SignalPayload::Offer { sdp: desc.sdp },
            SdpKind::Answer => SignalPayload::Answer { sdp: desc.sdp },
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSignal {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sdp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    candidate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username_fragment: Option<String>,
}

impl TryFrom<RawSignal> for SignalPayload {
    type Error = SignalError;

    fn try_from(raw: RawSignal) -> Result<Self, Self::Error> {
        if let Some(kind) = raw.kind {
            let Some(sdp) = raw.sdp else {
                return Err(SignalError::MissingSdp(kind));
            };
            return match kind.as_str() {
                "offer" => Ok(SignalPayload::Offer { sdp }),
                "answer" => Ok(SignalPayload::Answer { sdp }),
                _ => Err(SignalError::UnsupportedType(kind)),
            };
        }

        let Some(candidate) = raw.candidate else {
            return Err(SignalError::Unrecognized);
        };

        Ok(SignalPayload::Candidate(IceCandidate {
            candidate,
            sdp_mid: raw.sdp_mid,
            sdp_m_line_index: raw.sdp_m_line_index,
            username_fragment: raw.username_fragment,
        }))
    }
}

impl From<SignalPayload> for RawSignal {
    fn from(payload: SignalPayload) -> Self {
        let empty = RawSignal {
            kind: None,
            sdp: None,
            candidate: None,
            sdp_mid: None,
            sdp_m_line_index: None,
            username_fragment: None,
        };

        match payload {
            SignalPayload::Offer { sdp } => RawSignal {
                kind: Some("offer".to_owned()),
                sdp: Some(sdp),
                ..empty
            },
            SignalPayload::Answer { sdp } => RawSignal {
                kind: Some("answer".to_owned()),
                sdp: Some(sdp),
                ..empty
            },
            SignalPayload::Candidate(c) => RawSignal {
                candidate: Some(c.candidate),
                sdp_mid: c.sdp_mid,
                sdp_m_line_index: c.sdp_m_line_index,
                username_fragment: c.username_fragment,
                ..empty
            },
        }
    }
}
