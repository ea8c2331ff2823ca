//! Common data types for the signaling components.
//!
//! Three identifiers flow through the relay:
//!
//! - [`ConnectionId`] is minted by the transport for one physical socket and
//!   changes on every reconnect.
//! - [`SessionId`] is supplied by the client and names one participant's
//!   presence in a call, independent of the socket carrying it.
//! - [`RoomId`] is supplied by the client and names the call.
//!
//! All three serialize transparently as JSON strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Maximum accepted length (in bytes) of a client-supplied identifier.
pub const MAX_ID_LENGTH: usize = 256;

/// Validation failure for a client-supplied identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// Identifier is empty or whitespace only.
    #[error("must not be empty")]
    Empty,

    /// Identifier exceeds [`MAX_ID_LENGTH`].
    #[error("must be at most {max} bytes, got {actual}")]
    TooLong { max: usize, actual: usize },
}

fn validate_identifier(value: &str) -> Result<(), IdError> {
    if value.trim().is_empty() {
        return Err(IdError::Empty);
    }
    if value.len() > MAX_ID_LENGTH {
        return Err(IdError::TooLong {
            max: MAX_ID_LENGTH,
            actual: value.len(),
        });
    }
    Ok(())
}

/// Transport-assigned identifier for one physical connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Client-supplied stable identifier for a participant's call presence
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check the identifier is non-empty and within [`MAX_ID_LENGTH`].
    ///
    /// # Errors
    ///
    /// Returns [`IdError`] describing the first violated constraint.
    pub fn validate(&self) -> Result<(), IdError> {
        validate_identifier(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-supplied identifier for a call room
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check the identifier is non-empty and within [`MAX_ID_LENGTH`].
    ///
    /// # Errors
    ///
    /// Returns [`IdError`] describing the first violated constraint.
    pub fn validate(&self) -> Result<(), IdError> {
        validate_identifier(&self.0)
    }
}

impl From<String> for RoomId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_ids_are_unique() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let room = RoomId::from("r1");
        let session = SessionId::from("alice");
        assert_eq!(serde_json::to_string(&room).unwrap(), "\"r1\"");
        assert_eq!(serde_json::to_string(&session).unwrap(), "\"alice\"");

        let conn = ConnectionId::new();
        let json = serde_json::to_string(&conn).unwrap();
        assert_eq!(json, format!("\"{conn}\""));
        let back: ConnectionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, conn);
    }

    #[test]
    fn test_validate_rejects_blank_identifiers() {
        assert_eq!(RoomId::from("").validate(), Err(IdError::Empty));
        assert_eq!(SessionId::from("   ").validate(), Err(IdError::Empty));
        assert!(RoomId::from("room-42").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_oversized_identifiers() {
        let long = "x".repeat(MAX_ID_LENGTH + 1);
        assert_eq!(
            SessionId::from(long).validate(),
            Err(IdError::TooLong {
                max: MAX_ID_LENGTH,
                actual: MAX_ID_LENGTH + 1
            })
        );

        let exact = "x".repeat(MAX_ID_LENGTH);
        assert!(SessionId::from(exact).validate().is_ok());
    }

    #[test]
    fn test_display_matches_raw_value() {
        assert_eq!(RoomId::from("r1").to_string(), "r1");
        assert_eq!(SessionId::from("bob").as_str(), "bob");
    }
}
