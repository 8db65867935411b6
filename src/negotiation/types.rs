//! Wire types for the relay signaling protocol
//!
//! Every frame on the relay channel is a JSON object `{type, payload, from}`;
//! the payload shape depends on the type. Candidates are opaque values that
//! pass through the negotiator without inspection.

use serde::{Deserialize, Serialize};

/// Role of this endpoint in one negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Unset,
    Offerer,
    Answerer,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Unset => write!(f, "unset"),
            Role::Offerer => write!(f, "offerer"),
            Role::Answerer => write!(f, "answerer"),
        }
    }
}

/// Negotiation state for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    RoleAssigning,
    DescriptionExchange,
    CandidateExchange,
    Established,
    Failed,
}

impl std::fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NegotiationState::Idle => write!(f, "idle"),
            NegotiationState::RoleAssigning => write!(f, "role-assigning"),
            NegotiationState::DescriptionExchange => write!(f, "description-exchange"),
            NegotiationState::CandidateExchange => write!(f, "candidate-exchange"),
            NegotiationState::Established => write!(f, "established"),
            NegotiationState::Failed => write!(f, "failed"),
        }
    }
}

/// Kind of a session description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionKind {
    Offer,
    Answer,
}

/// Session description exchanged as offer or answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Description {
    #[serde(rename = "type")]
    pub kind: DescriptionKind,
    pub sdp: String,
}

impl Description {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: DescriptionKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: DescriptionKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Opaque network-reachability descriptor
///
/// Produced and consumed by the media engine; the negotiator relays it
/// without looking inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Candidate(pub serde_json::Value);

/// Payload of an inbound `remoteIceCandidates` frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateBatch {
    pub candidates: Vec<Candidate>,
}

/// Raw wire frame as exchanged with the relay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub from: String,
}

/// All signaling message types
///
/// `requestOffer`, `requestAnswer`, `answered` and `remoteIceCandidates` are
/// inbound; `offerResponse`, `answerResponse` and `iceCandidate` are outbound.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalingMessage {
    RequestOffer,
    OfferResponse(Description),
    RequestAnswer(Description),
    AnswerResponse(Description),
    Answered(Description),
    IceCandidate(Candidate),
    RemoteIceCandidates(Vec<Candidate>),
}

impl SignalingMessage {
    pub fn msg_type(&self) -> &'static str {
        match self {
            SignalingMessage::RequestOffer => "requestOffer",
            SignalingMessage::OfferResponse(_) => "offerResponse",
            SignalingMessage::RequestAnswer(_) => "requestAnswer",
            SignalingMessage::AnswerResponse(_) => "answerResponse",
            SignalingMessage::Answered(_) => "answered",
            SignalingMessage::IceCandidate(_) => "iceCandidate",
            SignalingMessage::RemoteIceCandidates(_) => "remoteIceCandidates",
        }
    }

    /// Decode a frame into a typed message
    ///
    /// Returns `Ok(None)` for an unknown `type`, which the caller drops.
    pub fn from_frame(frame: &Frame) -> Result<Option<Self>, serde_json::Error> {
        let msg = match frame.kind.as_str() {
            "requestOffer" => SignalingMessage::RequestOffer,
            "offerResponse" => {
                SignalingMessage::OfferResponse(serde_json::from_value(frame.payload.clone())?)
            }
            "requestAnswer" => {
                SignalingMessage::RequestAnswer(serde_json::from_value(frame.payload.clone())?)
            }
            "answerResponse" => {
                SignalingMessage::AnswerResponse(serde_json::from_value(frame.payload.clone())?)
            }
            "answered" => {
                SignalingMessage::Answered(serde_json::from_value(frame.payload.clone())?)
            }
            "iceCandidate" => SignalingMessage::IceCandidate(Candidate(frame.payload.clone())),
            "remoteIceCandidates" => {
                let batch: CandidateBatch = serde_json::from_value(frame.payload.clone())?;
                SignalingMessage::RemoteIceCandidates(batch.candidates)
            }
            _ => return Ok(None),
        };
        Ok(Some(msg))
    }

    /// Encode into a wire frame, attaching the sender id
    pub fn into_frame(self, from: &str) -> Frame {
        let kind = self.msg_type().to_string();
        let payload = match self {
            SignalingMessage::RequestOffer => serde_json::json!({}),
            SignalingMessage::OfferResponse(d)
            | SignalingMessage::RequestAnswer(d)
            | SignalingMessage::AnswerResponse(d)
            | SignalingMessage::Answered(d) => serde_json::to_value(d).unwrap_or_default(),
            SignalingMessage::IceCandidate(c) => c.0,
            SignalingMessage::RemoteIceCandidates(candidates) => {
                serde_json::to_value(CandidateBatch { candidates }).unwrap_or_default()
            }
        };
        Frame {
            kind,
            payload,
            from: from.to_string(),
        }
    }
}
