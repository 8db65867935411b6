//! Tests for the relay wire protocol

use super::channel::{ChannelEvent, SignalingChannel};
use super::types::*;

#[test]
fn test_request_offer_frame_format() {
    let frame = SignalingMessage::RequestOffer.into_frame("peer-1");
    let json = serde_json::to_string(&frame).unwrap();

    assert!(json.contains("\"type\":\"requestOffer\""));
    assert!(json.contains("\"from\":\"peer-1\""));

    let parsed: Frame = serde_json::from_str(&json).unwrap();
    let msg = SignalingMessage::from_frame(&parsed).unwrap().unwrap();
    assert_eq!(msg, SignalingMessage::RequestOffer);
}

#[test]
fn test_offer_response_frame_format() {
    let offer = Description::offer("v=0\r\no=- 123 456 IN IP4 127.0.0.1\r\n");
    let frame = SignalingMessage::OfferResponse(offer.clone()).into_frame("peer-1");
    let json = serde_json::to_string(&frame).unwrap();

    assert!(json.contains("\"type\":\"offerResponse\""));
    // Payload keeps the browser spelling: {type: "offer", sdp: ...}
    assert!(json.contains("\"type\":\"offer\""));
    assert!(json.contains("\"sdp\""));

    let parsed: Frame = serde_json::from_str(&json).unwrap();
    match SignalingMessage::from_frame(&parsed).unwrap().unwrap() {
        SignalingMessage::OfferResponse(d) => assert_eq!(d, offer),
        other => panic!("Expected offerResponse, got {}", other.msg_type()),
    }
}

#[test]
fn test_parse_relay_request_answer() {
    // Exact frame shape the relay delivers
    let raw = r#"{"type":"requestAnswer","payload":{"type":"offer","sdp":"X"},"from":"peer-2"}"#;
    let frame: Frame = serde_json::from_str(raw).unwrap();
    assert_eq!(frame.from, "peer-2");

    match SignalingMessage::from_frame(&frame).unwrap().unwrap() {
        SignalingMessage::RequestAnswer(offer) => {
            assert_eq!(offer.kind, DescriptionKind::Offer);
            assert_eq!(offer.sdp, "X");
        }
        other => panic!("Expected requestAnswer, got {}", other.msg_type()),
    }
}

#[test]
fn test_parse_relay_answered() {
    let raw = r#"{"type":"answered","payload":{"type":"answer","sdp":"Y"},"from":"peer-2"}"#;
    let frame: Frame = serde_json::from_str(raw).unwrap();

    match SignalingMessage::from_frame(&frame).unwrap().unwrap() {
        SignalingMessage::Answered(answer) => {
            assert_eq!(answer.kind, DescriptionKind::Answer);
            assert_eq!(answer.sdp, "Y");
        }
        other => panic!("Expected answered, got {}", other.msg_type()),
    }
}

#[test]
fn test_candidate_payload_stays_opaque() {
    // Whatever the engine produced goes out untouched, one per frame
    let candidate = Candidate(serde_json::json!({
        "candidate": "candidate:1 1 UDP 2130706431 192.168.1.1 54321 typ host",
        "sdpMid": "0",
        "sdpMLineIndex": 0,
        "usernameFragment": "abcd"
    }));

    let frame = SignalingMessage::IceCandidate(candidate.clone()).into_frame("peer-1");
    assert_eq!(frame.kind, "iceCandidate");
    assert_eq!(frame.payload, candidate.0);

    let round = SignalingMessage::from_frame(&frame).unwrap().unwrap();
    assert_eq!(round, SignalingMessage::IceCandidate(candidate));
}

#[test]
fn test_parse_remote_ice_candidates_batch() {
    let raw = r#"{"type":"remoteIceCandidates","payload":{"candidates":[{"candidate":"c1"},{"candidate":"c2"}]},"from":"peer-2"}"#;
    let frame: Frame = serde_json::from_str(raw).unwrap();

    match SignalingMessage::from_frame(&frame).unwrap().unwrap() {
        SignalingMessage::RemoteIceCandidates(candidates) => {
            assert_eq!(candidates.len(), 2);
            assert_eq!(candidates[0].0["candidate"], "c1");
            assert_eq!(candidates[1].0["candidate"], "c2");
        }
        other => panic!("Expected remoteIceCandidates, got {}", other.msg_type()),
    }
}

#[test]
fn test_empty_candidate_batch_parses() {
    let raw = r#"{"type":"remoteIceCandidates","payload":{"candidates":[]},"from":"peer-2"}"#;
    let frame: Frame = serde_json::from_str(raw).unwrap();

    match SignalingMessage::from_frame(&frame).unwrap().unwrap() {
        SignalingMessage::RemoteIceCandidates(candidates) => assert!(candidates.is_empty()),
        other => panic!("Expected remoteIceCandidates, got {}", other.msg_type()),
    }
}

#[test]
fn test_unknown_message_type_is_dropped() {
    let frame: Frame =
        serde_json::from_str(r#"{"type":"ping","payload":{},"from":"relay"}"#).unwrap();
    assert!(SignalingMessage::from_frame(&frame).unwrap().is_none());

    // The adapter drops it without producing any event
    assert_eq!(
        SignalingChannel::decode(r#"{"type":"ping","payload":{},"from":"relay"}"#),
        None
    );
}

#[test]
fn test_malformed_frame_surfaces() {
    match SignalingChannel::decode("not json at all") {
        Some(ChannelEvent::Malformed(_)) => {}
        other => panic!("Expected malformed event, got {:?}", other),
    }

    // Known type with a broken payload shape
    let broken = r#"{"type":"answered","payload":{"sdp":42},"from":"peer-2"}"#;
    match SignalingChannel::decode(broken) {
        Some(ChannelEvent::Malformed(_)) => {}
        other => panic!("Expected malformed event, got {:?}", other),
    }
}

#[test]
fn test_missing_payload_defaults() {
    // `requestOffer` carries an empty payload; tolerate it being absent
    let frame: Frame = serde_json::from_str(r#"{"type":"requestOffer","from":"relay"}"#).unwrap();
    let msg = SignalingMessage::from_frame(&frame).unwrap().unwrap();
    assert_eq!(msg, SignalingMessage::RequestOffer);
}

#[test]
fn test_msg_type_names() {
    assert_eq!(SignalingMessage::RequestOffer.msg_type(), "requestOffer");
    assert_eq!(
        SignalingMessage::AnswerResponse(Description::answer("y")).msg_type(),
        "answerResponse"
    );
    assert_eq!(
        SignalingMessage::RemoteIceCandidates(vec![]).msg_type(),
        "remoteIceCandidates"
    );
}
