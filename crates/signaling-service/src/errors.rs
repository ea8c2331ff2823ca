//! Signaling service error types.
//!
//! Protocol errors are surfaced to the originating connection as an `error`
//! event carrying [`SignalingError::client_message`]. Internal details are
//! logged server-side but not exposed to clients.
//!
//! Lookup misses (unknown room, unknown session, late events for a room that
//! was already cleaned up) are *not* errors: they are expected transport
//! races and the router treats them as no-ops.

use common::types::IdError;
use thiserror::Error;

/// Signaling service error type.
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Inbound frame could not be decoded into a known event.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A decoded event carried an invalid field value.
    #[error("Invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// The router actor is gone (shutdown or crashed).
    #[error("Signaling router unavailable")]
    RouterUnavailable,

    /// Transport-level failure on a single connection.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SignalingError {
    /// Build an [`SignalingError::InvalidField`] from an identifier validation failure.
    #[must_use]
    pub fn invalid_id(field: &'static str, err: &IdError) -> Self {
        SignalingError::InvalidField {
            field,
            reason: err.to_string(),
        }
    }

    /// Bounded label for the `error_type` metric dimension.
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            SignalingError::Protocol(_) => "protocol",
            SignalingError::InvalidField { .. } => "invalid_field",
            SignalingError::RouterUnavailable => "router_unavailable",
            SignalingError::Transport(_) => "transport",
            SignalingError::Config(_) => "config",
            SignalingError::Internal(_) => "internal",
        }
    }

    /// Returns a client-safe error message (no internal details).
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            SignalingError::Protocol(detail) => format!("Malformed message: {detail}"),
            SignalingError::InvalidField { field, reason } => format!("Invalid {field}: {reason}"),
            SignalingError::RouterUnavailable => {
                "Server is shutting down, please reconnect".to_string()
            }
            SignalingError::Transport(_)
            | SignalingError::Config(_)
            | SignalingError::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}

impl From<serde_json::Error> for SignalingError {
    fn from(err: serde_json::Error) -> Self {
        SignalingError::Protocol(err.to_string())
    }
}
