//! Room membership table.
//!
//! Each room keeps `participants` (session -> connection) and `connections`
//! (connection -> session) as exact inverses. A room exists only while it
//! has at least one participant, and a connection sits in at most one room.
//!
//! Lookups for rooms or connections that are not present return empty
//! results instead of errors: late events for a room that was already
//! cleaned up are a normal transport race.

use common::types::{ConnectionId, RoomId, SessionId};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Membership of a single room.
#[derive(Debug, Default)]
struct Room {
    participants: HashMap<SessionId, ConnectionId>,
    connections: HashMap<ConnectionId, SessionId>,
}

impl Room {
    fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    fn members(&self) -> Vec<(SessionId, ConnectionId)> {
        self.participants
            .iter()
            .map(|(session, conn)| (session.clone(), *conn))
            .collect()
    }
}

/// Result of [`RoomTable::join`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Participant count after the join.
    pub participant_count: usize,
    /// Connection that previously held this session's slot in the room.
    pub superseded: Option<ConnectionId>,
    /// Session this connection held in the room before re-joining under a
    /// different one. It is no longer a participant.
    pub replaced_session: Option<SessionId>,
}

/// Result of [`RoomTable::leave`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub room_id: RoomId,
    pub session_id: SessionId,
    /// Participants still in the room, in no particular order.
    pub remaining: Vec<(SessionId, ConnectionId)>,
    /// True when the departure emptied and deleted the room.
    pub room_closed: bool,
}

/// Read-only view of one room for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetail {
    pub participants: usize,
    pub session_ids: Vec<SessionId>,
    pub connection_ids: Vec<ConnectionId>,
}

#[derive(Debug, Default)]
pub struct RoomTable {
    rooms: HashMap<RoomId, Room>,
    /// Which room each connection is in.
    connection_rooms: HashMap<ConnectionId, RoomId>,
}

impl RoomTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `session_id` on `connection_id` to `room_id`, creating the room if needed.
    ///
    /// If the session already held the room through a different connection,
    /// that connection is evicted from the room (last writer wins). If the
    /// connection was in a different room it is removed from there first;
    /// callers that need to notify the old room should call [`Self::leave`]
    /// before joining.
    pub fn join(
        &mut self,
        room_id: &RoomId,
        session_id: &SessionId,
        connection_id: ConnectionId,
    ) -> JoinOutcome {
        if self
            .connection_rooms
            .get(&connection_id)
            .is_some_and(|current| current != room_id)
        {
            self.leave(connection_id);
        }

        let room = self.rooms.entry(room_id.clone()).or_default();

        // Same connection re-joining under a different session.
        let replaced_session = room
            .connections
            .get(&connection_id)
            .filter(|old| *old != session_id)
            .cloned();
        if let Some(old_session) = &replaced_session {
            room.participants.remove(old_session);
        }

        let superseded = room
            .participants
            .insert(session_id.clone(), connection_id)
            .filter(|old| *old != connection_id);

        if let Some(old) = superseded {
            room.connections.remove(&old);
            self.connection_rooms.remove(&old);
        }

        room.connections.insert(connection_id, session_id.clone());
        let participant_count = room.participants.len();
        self.connection_rooms.insert(connection_id, room_id.clone());

        JoinOutcome {
            participant_count,
            superseded,
            replaced_session,
        }
    }

    /// Remove `connection_id` from whichever room holds it.
    ///
    /// Returns `None` if the connection is in no room.
    pub fn leave(&mut self, connection_id: ConnectionId) -> Option<Departure> {
        let room_id = self.connection_rooms.remove(&connection_id)?;
        let room = self.rooms.get_mut(&room_id)?;

        let session_id = room.connections.remove(&connection_id)?;
        room.participants.remove(&session_id);

        let remaining = room.members();
        let room_closed = room.is_empty();
        if room_closed {
            self.rooms.remove(&room_id);
        }

        Some(Departure {
            room_id,
            session_id,
            remaining,
            room_closed,
        })
    }

    /// Participants of `room_id` other than `excluding`. Unknown room yields none.
    #[must_use]
    pub fn list_others(
        &self,
        room_id: &RoomId,
        excluding: &SessionId,
    ) -> Vec<(SessionId, ConnectionId)> {
        self.rooms.get(room_id).map_or_else(Vec::new, |room| {
            room.participants
                .iter()
                .filter(|(session, _)| *session != excluding)
                .map(|(session, conn)| (session.clone(), *conn))
                .collect()
        })
    }

    /// Connections in `room_id` other than `excluding`. Unknown room yields none.
    #[must_use]
    pub fn connections_except(&self, room_id: &RoomId, excluding: ConnectionId) -> Vec<ConnectionId> {
        self.rooms.get(room_id).map_or_else(Vec::new, |room| {
            room.connections
                .keys()
                .filter(|conn| **conn != excluding)
                .copied()
                .collect()
        })
    }

    /// Room currently holding `connection_id`.
    #[cfg(test)]
    pub fn room_of(&self, connection_id: ConnectionId) -> Option<&RoomId> {
        self.connection_rooms.get(&connection_id)
    }

    /// Session a connection holds in `room_id`.
    #[cfg(test)]
    pub fn session_in(&self, room_id: &RoomId, connection_id: ConnectionId) -> Option<&SessionId> {
        self.rooms
            .get(room_id)
            .and_then(|room| room.connections.get(&connection_id))
    }

    #[cfg(test)]
    pub fn participant_count(&self, room_id: &RoomId) -> usize {
        self.rooms
            .get(room_id)
            .map_or(0, |room| room.participants.len())
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    #[must_use]
    pub fn contains_room(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Sorted snapshot of every room for the status endpoint.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<RoomId, RoomDetail> {
        self.rooms
            .iter()
            .map(|(room_id, room)| {
                let mut session_ids: Vec<SessionId> = room.participants.keys().cloned().collect();
                session_ids.sort();
                let mut connection_ids: Vec<ConnectionId> =
                    room.connections.keys().copied().collect();
                connection_ids.sort();

                (
                    room_id.clone(),
                    RoomDetail {
                        participants: room.participants.len(),
                        session_ids,
                        connection_ids,
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    /// Every room is non-empty, both maps are exact inverses, and the
    /// connection index agrees with room contents.
    fn assert_consistent(table: &RoomTable) {
        let mut indexed = 0;
        for (room_id, room) in &table.rooms {
            assert!(!room.is_empty(), "empty room {room_id} left behind");
            assert_eq!(room.participants.len(), room.connections.len());
            for (session, conn) in &room.participants {
                assert_eq!(room.connections.get(conn), Some(session));
                assert_eq!(table.connection_rooms.get(conn), Some(room_id));
                indexed += 1;
            }
        }
        assert_eq!(indexed, table.connection_rooms.len());
    }

    fn room(id: &str) -> RoomId {
        RoomId::from(id)
    }

    fn session(id: &str) -> SessionId {
        SessionId::from(id)
    }

    #[test]
    fn test_join_creates_room_lazily() {
        let mut table = RoomTable::new();
        assert!(!table.contains_room(&room("r1")));

        let outcome = table.join(&room("r1"), &session("alice"), ConnectionId::new());
        assert_eq!(outcome.participant_count, 1);
        assert_eq!(outcome.superseded, None);
        assert_eq!(table.room_count(), 1);
        assert_consistent(&table);
    }

    #[test]
    fn test_rejoin_replaces_connection() {
        let mut table = RoomTable::new();
        let c1 = ConnectionId::new();
        let c2 = ConnectionId::new();

        table.join(&room("r1"), &session("alice"), c1);
        let outcome = table.join(&room("r1"), &session("alice"), c2);

        assert_eq!(outcome.participant_count, 1);
        assert_eq!(outcome.superseded, Some(c1));
        assert_eq!(outcome.replaced_session, None);
        assert_eq!(table.room_of(c1), None);
        assert_eq!(table.session_in(&room("r1"), c2), Some(&session("alice")));
        assert_eq!(table.session_in(&room("r1"), c1), None);
        assert_consistent(&table);

        // The superseded connection leaving is a no-op for the room.
        assert_eq!(table.leave(c1), None);
        assert_eq!(table.participant_count(&room("r1")), 1);
    }

    #[test]
    fn test_same_connection_new_session_replaces_entry() {
        let mut table = RoomTable::new();
        let conn = ConnectionId::new();

        table.join(&room("r1"), &session("alice"), conn);
        let outcome = table.join(&room("r1"), &session("bob"), conn);

        assert_eq!(outcome.participant_count, 1);
        assert_eq!(outcome.superseded, None);
        assert_eq!(outcome.replaced_session, Some(session("alice")));
        assert!(table.list_others(&room("r1"), &session("bob")).is_empty());
        assert_consistent(&table);

        // Same session again replaces nothing.
        let outcome = table.join(&room("r1"), &session("bob"), conn);
        assert_eq!(outcome.replaced_session, None);
    }

    #[test]
    fn test_join_other_room_moves_connection() {
        let mut table = RoomTable::new();
        let conn = ConnectionId::new();

        table.join(&room("r1"), &session("alice"), conn);
        table.join(&room("r2"), &session("alice"), conn);

        assert!(!table.contains_room(&room("r1")));
        assert_eq!(table.room_of(conn), Some(&room("r2")));
        assert_consistent(&table);
    }

    #[test]
    fn test_leave_reports_remaining_and_closes_empty_room() {
        let mut table = RoomTable::new();
        let x = ConnectionId::new();
        let y = ConnectionId::new();
        table.join(&room("r1"), &session("alice"), x);
        table.join(&room("r1"), &session("bob"), y);

        let departure = table.leave(y).expect("bob was in r1");
        assert_eq!(departure.room_id, room("r1"));
        assert_eq!(departure.session_id, session("bob"));
        assert_eq!(departure.remaining, vec![(session("alice"), x)]);
        assert!(!departure.room_closed);
        assert_consistent(&table);

        let departure = table.leave(x).expect("alice was in r1");
        assert!(departure.remaining.is_empty());
        assert!(departure.room_closed);
        assert!(!table.contains_room(&room("r1")));
        assert!(table.list_others(&room("r1"), &session("alice")).is_empty());
        assert_consistent(&table);
    }

    #[test]
    fn test_leave_unknown_connection_is_noop() {
        let mut table = RoomTable::new();
        table.join(&room("r1"), &session("alice"), ConnectionId::new());

        assert_eq!(table.leave(ConnectionId::new()), None);
        assert_eq!(table.participant_count(&room("r1")), 1);
        assert_consistent(&table);
    }

    #[test]
    fn test_list_others_excludes_session() {
        let mut table = RoomTable::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let c = ConnectionId::new();
        table.join(&room("r1"), &session("a"), a);
        table.join(&room("r1"), &session("b"), b);
        table.join(&room("r1"), &session("c"), c);

        let mut others = table.list_others(&room("r1"), &session("a"));
        others.sort();
        let mut expected = vec![(session("b"), b), (session("c"), c)];
        expected.sort();
        assert_eq!(others, expected);

        let mut recipients = table.connections_except(&room("r1"), a);
        recipients.sort();
        let mut expected = vec![b, c];
        expected.sort();
        assert_eq!(recipients, expected);

        assert!(table.list_others(&room("missing"), &session("a")).is_empty());
        assert!(table.connections_except(&room("missing"), a).is_empty());
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let mut table = RoomTable::new();
        let c1 = ConnectionId::new();
        let c2 = ConnectionId::new();
        table.join(&room("r2"), &session("zed"), c1);
        table.join(&room("r1"), &session("bob"), c2);
        table.join(&room("r2"), &session("amy"), ConnectionId::new());

        let snapshot = table.snapshot();
        let keys: Vec<&RoomId> = snapshot.keys().collect();
        assert_eq!(keys, vec![&room("r1"), &room("r2")]);

        let r2 = snapshot.get(&room("r2")).unwrap();
        assert_eq!(r2.participants, 2);
        assert_eq!(r2.session_ids, vec![session("amy"), session("zed")]);
        assert_eq!(r2.connection_ids.len(), 2);
    }

    #[test]
    fn test_churn_keeps_maps_consistent() {
        let mut table = RoomTable::new();
        let conns: Vec<ConnectionId> = (0..6).map(|_| ConnectionId::new()).collect();
        let rooms = ["r1", "r2"];
        let sessions = ["s1", "s2", "s3"];

        for (i, conn) in conns.iter().enumerate() {
            let r = rooms.get(i % rooms.len()).unwrap();
            let s = sessions.get(i % sessions.len()).unwrap();
            table.join(&room(r), &session(s), *conn);
            assert_consistent(&table);
        }
        for conn in conns.iter().step_by(2) {
            table.leave(*conn);
            assert_consistent(&table);
        }
        for conn in &conns {
            table.leave(*conn);
            assert_consistent(&table);
        }
        assert_eq!(table.room_count(), 0);
    }
}
