//! Messages accepted by the router actor.

use crate::protocol::{ClientEvent, ServerEvent};
use crate::state::RoomDetail;
use common::types::{ConnectionId, RoomId};
use std::collections::BTreeMap;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// Per-connection outbound queue, drained by the socket writer.
pub type Outbound = mpsc::UnboundedSender<ServerEvent>;

/// Why a connection went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Client sent a close frame or the stream ended cleanly.
    ClientClosed,
    /// Socket error or heartbeat timeout.
    TransportError,
    /// Server is shutting down.
    ServerShutdown,
}

impl DisconnectReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DisconnectReason::ClientClosed => "client closed",
            DisconnectReason::TransportError => "transport error",
            DisconnectReason::ServerShutdown => "server shutdown",
        }
    }

    /// Metric label form.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            DisconnectReason::ClientClosed => "client_closed",
            DisconnectReason::TransportError => "transport_error",
            DisconnectReason::ServerShutdown => "server_shutdown",
        }
    }
}

/// Messages handled by `SignalingRouterActor`.
#[derive(Debug)]
pub enum RouterMessage {
    /// A socket was accepted.
    Connect {
        connection_id: ConnectionId,
        outbound: Outbound,
    },

    /// An inbound event arrived on a socket.
    Dispatch {
        connection_id: ConnectionId,
        event: ClientEvent,
        received_at: Instant,
    },

    /// A socket went away.
    Disconnect {
        connection_id: ConnectionId,
        reason: DisconnectReason,
    },

    /// Read-only snapshot for the status endpoint.
    GetStatus {
        respond_to: oneshot::Sender<RouterStatus>,
    },

    /// Stop the actor.
    Shutdown { respond_to: oneshot::Sender<()> },
}

/// Router status snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterStatus {
    /// Rooms keyed by id, sorted.
    pub rooms: BTreeMap<RoomId, RoomDetail>,
    /// Registered sessions.
    pub total_connections: usize,
    /// Open sockets, joined or not.
    pub open_connections: usize,
    /// Messages queued behind the status request.
    pub mailbox_depth: usize,
    /// Messages handled since start.
    pub messages_processed: u64,
}

impl RouterStatus {
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
