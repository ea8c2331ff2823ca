//! Signaling wire protocol.
//!
//! Every WebSocket text frame is a JSON object of the form
//! `{"event": "<name>", "data": {...}}`. Event names are kebab-case and
//! field names camelCase, matching what browser clients already speak.
//!
//! Negotiation payloads (`offer`, `answer`, `candidate`, chat `message`,
//! `mediaState`) are opaque to the relay and are forwarded verbatim as
//! [`serde_json::Value`]s. Only their outer shape is checked.

use crate::errors::SignalingError;
use common::types::{ConnectionId, RoomId, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound event (client -> server).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Join a room under a stable session identifier.
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_id: RoomId,
        session_id: SessionId,
    },

    /// Explicitly leave a room without closing the socket.
    #[serde(rename_all = "camelCase")]
    LeaveRoom { room_id: RoomId },

    /// SDP offer for every other member of the room.
    #[serde(rename_all = "camelCase")]
    Offer {
        room_id: RoomId,
        offer: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender_connection_id: Option<String>,
    },

    /// SDP answer for every other member of the room.
    #[serde(rename_all = "camelCase")]
    Answer {
        room_id: RoomId,
        answer: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender_connection_id: Option<String>,
    },

    /// ICE candidate. `null` marks end-of-candidates.
    #[serde(rename_all = "camelCase")]
    Candidate {
        room_id: RoomId,
        #[serde(default)]
        candidate: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender_connection_id: Option<String>,
    },

    /// In-call chat message.
    #[serde(rename_all = "camelCase")]
    ChatMessage { room_id: RoomId, message: Value },

    /// Microphone/camera state change.
    #[serde(rename_all = "camelCase")]
    MediaStateChange { room_id: RoomId, media_state: Value },
}

impl ClientEvent {
    /// Bounded event name for logs and metric labels.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinRoom { .. } => "join-room",
            ClientEvent::LeaveRoom { .. } => "leave-room",
            ClientEvent::Offer { .. } => "offer",
            ClientEvent::Answer { .. } => "answer",
            ClientEvent::Candidate { .. } => "candidate",
            ClientEvent::ChatMessage { .. } => "chat-message",
            ClientEvent::MediaStateChange { .. } => "media-state-change",
        }
    }

    /// Room the event targets.
    #[must_use]
    pub fn room_id(&self) -> &RoomId {
        match self {
            ClientEvent::JoinRoom { room_id, .. }
            | ClientEvent::LeaveRoom { room_id }
            | ClientEvent::Offer { room_id, .. }
            | ClientEvent::Answer { room_id, .. }
            | ClientEvent::Candidate { room_id, .. }
            | ClientEvent::ChatMessage { room_id, .. }
            | ClientEvent::MediaStateChange { room_id, .. } => room_id,
        }
    }

    /// Client-reported sender connection id, if the event carries one.
    #[must_use]
    pub fn claimed_sender(&self) -> Option<&str> {
        match self {
            ClientEvent::Offer {
                sender_connection_id,
                ..
            }
            | ClientEvent::Answer {
                sender_connection_id,
                ..
            }
            | ClientEvent::Candidate {
                sender_connection_id,
                ..
            } => sender_connection_id.as_deref(),
            _ => None,
        }
    }

    /// Check identifiers and payload shapes.
    ///
    /// # Errors
    ///
    /// Returns [`SignalingError::InvalidField`] naming the first bad field.
    pub fn validate(&self) -> Result<(), SignalingError> {
        self.room_id()
            .validate()
            .map_err(|e| SignalingError::invalid_id("roomId", &e))?;

        match self {
            ClientEvent::JoinRoom { session_id, .. } => session_id
                .validate()
                .map_err(|e| SignalingError::invalid_id("sessionId", &e)),
            ClientEvent::LeaveRoom { .. } | ClientEvent::ChatMessage { .. } => Ok(()),
            ClientEvent::Offer { offer, .. } => require_object("offer", offer),
            ClientEvent::Answer { answer, .. } => require_object("answer", answer),
            ClientEvent::Candidate { candidate, .. } => {
                if candidate.is_null() {
                    Ok(())
                } else {
                    require_object("candidate", candidate)
                }
            }
            ClientEvent::MediaStateChange { media_state, .. } => {
                require_object("mediaState", media_state)
            }
        }
    }
}

fn require_object(field: &'static str, value: &Value) -> Result<(), SignalingError> {
    if value.is_object() {
        Ok(())
    } else {
        Err(SignalingError::InvalidField {
            field,
            reason: "must be a JSON object".to_string(),
        })
    }
}

/// Decode one inbound text frame.
///
/// Field values are checked later by [`ClientEvent::validate`], inside the
/// router, so every caller of the router gets the same checks.
///
/// # Errors
///
/// Returns [`SignalingError::Protocol`] for frames that are not a known event.
pub fn decode_client_event(text: &str) -> Result<ClientEvent, SignalingError> {
    Ok(serde_json::from_str(text)?)
}

/// Outbound event (server -> client).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// First frame on every socket: the id the server assigned to it.
    #[serde(rename_all = "camelCase")]
    Connected { connection_id: ConnectionId },

    /// A new participant joined the room.
    #[serde(rename_all = "camelCase")]
    UserJoined {
        session_id: SessionId,
        connection_id: ConnectionId,
    },

    /// Existing members of the room the recipient just joined.
    #[serde(rename_all = "camelCase")]
    CurrentParticipants { session_ids: Vec<SessionId> },

    #[serde(rename_all = "camelCase")]
    Offer {
        offer: Value,
        sender_connection_id: ConnectionId,
    },

    #[serde(rename_all = "camelCase")]
    Answer {
        answer: Value,
        sender_connection_id: ConnectionId,
    },

    #[serde(rename_all = "camelCase")]
    Candidate {
        candidate: Value,
        sender_connection_id: ConnectionId,
    },

    #[serde(rename_all = "camelCase")]
    ChatMessage { message: Value },

    #[serde(rename_all = "camelCase")]
    MediaStateChange {
        media_state: Value,
        sender_connection_id: ConnectionId,
    },

    /// A participant left the room or its connection dropped.
    #[serde(rename_all = "camelCase")]
    UserLeft {
        session_id: SessionId,
        connection_id: ConnectionId,
    },

    /// Handler-level failure, sent only to the originating connection.
    Error { message: String },
}

impl ServerEvent {
    /// Build an `error` event from a [`SignalingError`].
    #[must_use]
    pub fn from_error(err: &SignalingError) -> Self {
        ServerEvent::Error {
            message: err.client_message(),
        }
    }

    /// Bounded event name for logs and metric labels.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::UserJoined { .. } => "user-joined",
            ServerEvent::CurrentParticipants { .. } => "current-participants",
            ServerEvent::Offer { .. } => "offer",
            ServerEvent::Answer { .. } => "answer",
            ServerEvent::Candidate { .. } => "candidate",
            ServerEvent::ChatMessage { .. } => "chat-message",
            ServerEvent::MediaStateChange { .. } => "media-state-change",
            ServerEvent::UserLeft { .. } => "user-left",
            ServerEvent::Error { .. } => "error",
        }
    }
}

/// Pull the SDP `type` and body length out of an offer/answer for logging.
#[must_use]
pub fn sdp_summary(payload: &Value) -> (&str, usize) {
    let sdp_type = payload
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let sdp_len = payload
        .get("sdp")
        .and_then(Value::as_str)
        .map_or(0, str::len);
    (sdp_type, sdp_len)
}
