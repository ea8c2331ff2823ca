//! Process-wide `SessionId` <-> `ConnectionId` mapping.
//!
//! The registry is independent of rooms. It answers "which session is this
//! socket?" for attribution and "which socket currently carries this
//! session?" for supersede detection. Both directions are kept as exact
//! inverses after every call.

use common::types::{ConnectionId, SessionId};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    by_session: HashMap<SessionId, ConnectionId>,
    by_connection: HashMap<ConnectionId, SessionId>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `session_id` to `connection_id`, overwriting both directions.
    ///
    /// Returns the connection that previously carried this session, if it was
    /// a different one. That connection no longer resolves to any session.
    pub fn register(
        &mut self,
        session_id: SessionId,
        connection_id: ConnectionId,
    ) -> Option<ConnectionId> {
        // The connection may have been registered under another session.
        if let Some(old_session) = self.by_connection.remove(&connection_id) {
            if old_session != session_id {
                self.by_session.remove(&old_session);
            }
        }

        let previous = self.by_session.insert(session_id.clone(), connection_id);
        let superseded = previous.filter(|old| *old != connection_id);
        if let Some(old) = superseded {
            self.by_connection.remove(&old);
        }

        self.by_connection.insert(connection_id, session_id);
        superseded
    }

    #[must_use]
    pub fn resolve_session(&self, connection_id: ConnectionId) -> Option<&SessionId> {
        self.by_connection.get(&connection_id)
    }

    #[cfg(test)]
    pub fn resolve_connection(&self, session_id: &SessionId) -> Option<ConnectionId> {
        self.by_session.get(session_id).copied()
    }

    /// Remove a session and its connection. Unknown session is a no-op.
    pub fn remove(&mut self, session_id: &SessionId) -> Option<ConnectionId> {
        let connection_id = self.by_session.remove(session_id)?;
        self.by_connection.remove(&connection_id);
        Some(connection_id)
    }

    /// Remove whatever session this connection carries. Unknown connection is a no-op.
    pub fn remove_by_connection(&mut self, connection_id: ConnectionId) -> Option<SessionId> {
        let session_id = self.by_connection.remove(&connection_id)?;
        self.by_session.remove(&session_id);
        Some(session_id)
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_session.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_session.is_empty()
    }
}
