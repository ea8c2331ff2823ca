//! Client event fixtures.
//!
//! Payloads look like what a browser `RTCPeerConnection` produces, trimmed
//! to the fields the relay cares about.

use serde_json::{json, Value};
use signaling_service::protocol::ClientEvent;

/// Minimal SDP body.
pub const TEST_SDP: &str = "v=0\r\no=- 4611731400430051336 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n";

/// `{"type": "offer", "sdp": ...}`
#[must_use]
pub fn offer_payload() -> Value {
    json!({ "type": "offer", "sdp": TEST_SDP })
}

/// `{"type": "answer", "sdp": ...}`
#[must_use]
pub fn answer_payload() -> Value {
    json!({ "type": "answer", "sdp": TEST_SDP })
}

/// A host ICE candidate.
#[must_use]
pub fn candidate_payload() -> Value {
    json!({
        "candidate": "candidate:842163049 1 udp 1677729535 192.0.2.10 53705 typ host",
        "sdpMid": "0",
        "sdpMLineIndex": 0
    })
}

#[must_use]
pub fn join(room_id: &str, session_id: &str) -> ClientEvent {
    ClientEvent::JoinRoom {
        room_id: room_id.into(),
        session_id: session_id.into(),
    }
}

#[must_use]
pub fn leave(room_id: &str) -> ClientEvent {
    ClientEvent::LeaveRoom {
        room_id: room_id.into(),
    }
}

#[must_use]
pub fn offer(room_id: &str) -> ClientEvent {
    ClientEvent::Offer {
        room_id: room_id.into(),
        offer: offer_payload(),
        sender_connection_id: None,
    }
}

#[must_use]
pub fn answer(room_id: &str) -> ClientEvent {
    ClientEvent::Answer {
        room_id: room_id.into(),
        answer: answer_payload(),
        sender_connection_id: None,
    }
}

#[must_use]
pub fn candidate(room_id: &str) -> ClientEvent {
    ClientEvent::Candidate {
        room_id: room_id.into(),
        candidate: candidate_payload(),
        sender_connection_id: None,
    }
}

/// End-of-candidates marker (`candidate: null`).
#[must_use]
pub fn end_of_candidates(room_id: &str) -> ClientEvent {
    ClientEvent::Candidate {
        room_id: room_id.into(),
        candidate: Value::Null,
        sender_connection_id: None,
    }
}

#[must_use]
pub fn chat(room_id: &str, text: &str) -> ClientEvent {
    ClientEvent::ChatMessage {
        room_id: room_id.into(),
        message: json!({ "text": text }),
    }
}

#[must_use]
pub fn media_state(room_id: &str, audio: bool, video: bool) -> ClientEvent {
    ClientEvent::MediaStateChange {
        room_id: room_id.into(),
        media_state: json!({ "audio": audio, "video": video }),
    }
}

/// Raw text frame for `event`, as a browser would send it.
#[must_use]
pub fn to_frame(event: &ClientEvent) -> String {
    serde_json::to_string(event).expect("client events always serialize")
}
