//! `SignalingRouterActor` - owns room membership and forwards signaling.
//!
//! Every socket talks to the same router through a [`SignalingRouterHandle`].
//! The actor processes one [`RouterMessage`] at a time, so a join, leave or
//! forward (state read, mutation and fan-out) never interleaves with another.
//!
//! # Connection lifecycle
//!
//! ```text
//! Connect -> Unjoined --join-room--> Joined(room) --leave-room--> Unjoined
//!                                       |   ^
//!                                       |   +-- join-room (other room): implicit leave
//!                                       +-- superseded by same session elsewhere -> Unjoined
//! Disconnect (any state) -> removed
//! ```
//!
//! Outbound delivery goes through each connection's unbounded queue. A send
//! never blocks the router and is never sampled or skipped.

use crate::config;
use crate::errors::SignalingError;
use crate::observability::metrics;
use crate::protocol::{sdp_summary, ClientEvent, ServerEvent};
use crate::state::{RoomTable, SessionRegistry};

use super::messages::{DisconnectReason, Outbound, RouterMessage, RouterStatus};
use super::metrics::MailboxMonitor;

use common::types::{ConnectionId, RoomId, SessionId};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Router tuning.
#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    /// Mailbox capacity.
    pub channel_buffer: usize,
    /// Log one candidate line per this many forwarded candidates.
    pub candidate_log_every: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            channel_buffer: config::DEFAULT_ROUTER_CHANNEL_BUFFER,
            candidate_log_every: config::DEFAULT_CANDIDATE_LOG_EVERY,
        }
    }
}

/// Handle to the `SignalingRouterActor`.
#[derive(Clone, Debug)]
pub struct SignalingRouterHandle {
    sender: mpsc::Sender<RouterMessage>,
    cancel_token: CancellationToken,
}

impl SignalingRouterHandle {
    /// Spawn a router with its own root cancellation token.
    #[must_use]
    pub fn new(config: RouterConfig) -> Self {
        let (handle, _task) = SignalingRouterActor::spawn(config, CancellationToken::new());
        handle
    }

    /// Register a freshly accepted socket and its outbound queue.
    ///
    /// The router answers with a `connected` event on `outbound`.
    pub async fn connect(
        &self,
        connection_id: ConnectionId,
        outbound: Outbound,
    ) -> Result<(), SignalingError> {
        self.send(RouterMessage::Connect {
            connection_id,
            outbound,
        })
        .await
    }

    /// Hand an inbound event to the router. Does not wait for processing.
    pub async fn dispatch(
        &self,
        connection_id: ConnectionId,
        event: ClientEvent,
    ) -> Result<(), SignalingError> {
        self.send(RouterMessage::Dispatch {
            connection_id,
            event,
            received_at: Instant::now(),
        })
        .await
    }

    /// Report a socket as gone.
    pub async fn disconnect(
        &self,
        connection_id: ConnectionId,
        reason: DisconnectReason,
    ) -> Result<(), SignalingError> {
        self.send(RouterMessage::Disconnect {
            connection_id,
            reason,
        })
        .await
    }

    /// Snapshot room membership.
    ///
    /// The reply is produced after every message sent earlier on this
    /// handle has been handled.
    pub async fn get_status(&self) -> Result<RouterStatus, SignalingError> {
        let (tx, rx) = oneshot::channel();
        self.send(RouterMessage::GetStatus { respond_to: tx })
            .await?;

        rx.await
            .map_err(|e| SignalingError::Internal(format!("response receive failed: {e}")))
    }

    /// Resolve once no sockets are registered, checking every `poll`.
    ///
    /// Callers bound this with a timeout; sockets that never report their
    /// disconnect keep it pending.
    pub async fn wait_for_no_connections(&self, poll: Duration) -> Result<(), SignalingError> {
        loop {
            if self.get_status().await?.open_connections == 0 {
                return Ok(());
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Stop the router after the messages already queued.
    pub async fn shutdown(&self) -> Result<(), SignalingError> {
        let (tx, rx) = oneshot::channel();
        self.send(RouterMessage::Shutdown { respond_to: tx })
            .await?;

        rx.await
            .map_err(|e| SignalingError::Internal(format!("response receive failed: {e}")))
    }

    /// Cancel the actor (for immediate shutdown).
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Child token for tasks that should stop with the router.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    async fn send(&self, message: RouterMessage) -> Result<(), SignalingError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| SignalingError::RouterUnavailable)
    }
}

/// Where a connection stands with respect to rooms.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConnectionState {
    Unjoined,
    Joined(RoomId),
}

/// An open socket as seen by the router.
struct Peer {
    outbound: Outbound,
    state: ConnectionState,
}

/// The `SignalingRouterActor` implementation.
pub struct SignalingRouterActor {
    receiver: mpsc::Receiver<RouterMessage>,
    cancel_token: CancellationToken,
    config: RouterConfig,
    rooms: RoomTable,
    sessions: SessionRegistry,
    peers: HashMap<ConnectionId, Peer>,
    /// Candidates forwarded since start, for log sampling.
    candidates_seen: u64,
    mailbox: MailboxMonitor,
}

impl SignalingRouterActor {
    /// Spawn the router.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(
        config: RouterConfig,
        cancel_token: CancellationToken,
    ) -> (SignalingRouterHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.channel_buffer.max(1));

        let actor = Self {
            receiver,
            cancel_token: cancel_token.clone(),
            config,
            rooms: RoomTable::new(),
            sessions: SessionRegistry::new(),
            peers: HashMap::new(),
            candidates_seen: 0,
            mailbox: MailboxMonitor::new("router"),
        };

        let task_handle = tokio::spawn(actor.run());

        (
            SignalingRouterHandle {
                sender,
                cancel_token,
            },
            task_handle,
        )
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "signaling.actor.router")]
    async fn run(mut self) {
        info!(target: "signaling.actor.router", "SignalingRouterActor started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "signaling.actor.router",
                        "SignalingRouterActor received cancellation signal"
                    );
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(RouterMessage::Shutdown { respond_to }) => {
                            info!(target: "signaling.actor.router", "Router shutdown requested");
                            self.cancel_token.cancel();
                            let _ = respond_to.send(());
                            break;
                        }
                        Some(message) => {
                            self.mailbox.record_depth(self.receiver.len());
                            self.handle_message(message);
                            self.mailbox.record_processed();
                        }
                        None => {
                            info!(
                                target: "signaling.actor.router",
                                "SignalingRouterActor channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        self.release_peers();

        info!(
            target: "signaling.actor.router",
            rooms_remaining = self.rooms.room_count(),
            messages_processed = self.mailbox.messages_processed(),
            peak_mailbox_depth = self.mailbox.peak_depth(),
            "SignalingRouterActor stopped"
        );
    }

    /// Handle a single message.
    fn handle_message(&mut self, message: RouterMessage) {
        match message {
            RouterMessage::Connect {
                connection_id,
                outbound,
            } => self.handle_connect(connection_id, outbound),

            RouterMessage::Dispatch {
                connection_id,
                event,
                received_at,
            } => {
                let event_name = event.name();
                metrics::record_event(event_name);
                self.handle_event(connection_id, event);
                metrics::record_event_latency(event_name, received_at.elapsed());
            }

            RouterMessage::Disconnect {
                connection_id,
                reason,
            } => self.handle_disconnect(connection_id, reason),

            RouterMessage::GetStatus { respond_to } => {
                let _ = respond_to.send(self.status());
            }

            // Intercepted by the run loop.
            RouterMessage::Shutdown { respond_to } => {
                let _ = respond_to.send(());
            }
        }
    }

    fn handle_connect(&mut self, connection_id: ConnectionId, outbound: Outbound) {
        let _ = outbound.send(ServerEvent::Connected { connection_id });

        let replaced = self
            .peers
            .insert(
                connection_id,
                Peer {
                    outbound,
                    state: ConnectionState::Unjoined,
                },
            )
            .is_some();

        if replaced {
            warn!(
                target: "signaling.actor.router",
                connection_id = %connection_id,
                "Connection id registered twice, previous outbound queue dropped"
            );
        }

        debug!(
            target: "signaling.actor.router",
            connection_id = %connection_id,
            open_connections = self.peers.len(),
            "Connection registered"
        );
        self.publish_gauges();
    }

    fn handle_event(&mut self, connection_id: ConnectionId, event: ClientEvent) {
        if !self.peers.contains_key(&connection_id) {
            debug!(
                target: "signaling.actor.router",
                connection_id = %connection_id,
                event = event.name(),
                "Event from unknown or departed connection ignored"
            );
            return;
        }

        if let Err(e) = event.validate() {
            self.reject(connection_id, event.name(), &e);
            return;
        }

        if let Some(claimed) = event.claimed_sender() {
            if claimed != connection_id.to_string() {
                warn!(
                    target: "signaling.actor.router",
                    connection_id = %connection_id,
                    claimed_sender = %claimed,
                    event = event.name(),
                    "Client-reported sender does not match connection, using connection id"
                );
            }
        }

        match event {
            ClientEvent::JoinRoom {
                room_id,
                session_id,
            } => self.handle_join(connection_id, room_id, session_id),

            ClientEvent::LeaveRoom { room_id } => self.handle_leave_room(connection_id, &room_id),

            ClientEvent::Offer { room_id, offer, .. } => {
                let (sdp_type, sdp_len) = sdp_summary(&offer);
                let sdp_type = sdp_type.to_string();
                let delivered = self.forward(
                    connection_id,
                    &room_id,
                    &ServerEvent::Offer {
                        offer,
                        sender_connection_id: connection_id,
                    },
                );
                info!(
                    target: "signaling.actor.router",
                    connection_id = %connection_id,
                    room_id = %room_id,
                    sdp_type = %sdp_type,
                    sdp_len = sdp_len,
                    recipients = delivered,
                    "Offer forwarded"
                );
            }

            ClientEvent::Answer {
                room_id, answer, ..
            } => {
                let (sdp_type, sdp_len) = sdp_summary(&answer);
                let sdp_type = sdp_type.to_string();
                let delivered = self.forward(
                    connection_id,
                    &room_id,
                    &ServerEvent::Answer {
                        answer,
                        sender_connection_id: connection_id,
                    },
                );
                info!(
                    target: "signaling.actor.router",
                    connection_id = %connection_id,
                    room_id = %room_id,
                    sdp_type = %sdp_type,
                    sdp_len = sdp_len,
                    recipients = delivered,
                    "Answer forwarded"
                );
            }

            ClientEvent::Candidate {
                room_id, candidate, ..
            } => {
                let end_of_candidates = candidate.is_null();
                let delivered = self.forward(
                    connection_id,
                    &room_id,
                    &ServerEvent::Candidate {
                        candidate,
                        sender_connection_id: connection_id,
                    },
                );

                self.candidates_seen += 1;
                if self.candidates_seen % self.config.candidate_log_every.max(1) == 0 {
                    debug!(
                        target: "signaling.actor.router",
                        connection_id = %connection_id,
                        room_id = %room_id,
                        end_of_candidates = end_of_candidates,
                        recipients = delivered,
                        candidates_seen = self.candidates_seen,
                        "Candidate forwarded"
                    );
                }
            }

            ClientEvent::ChatMessage { room_id, message } => {
                let sender_session = self
                    .sessions
                    .resolve_session(connection_id)
                    .map(ToString::to_string);
                let delivered =
                    self.forward(connection_id, &room_id, &ServerEvent::ChatMessage { message });
                debug!(
                    target: "signaling.actor.router",
                    connection_id = %connection_id,
                    session_id = ?sender_session,
                    room_id = %room_id,
                    recipients = delivered,
                    "Chat message forwarded"
                );
            }

            ClientEvent::MediaStateChange {
                room_id,
                media_state,
            } => {
                let delivered = self.forward(
                    connection_id,
                    &room_id,
                    &ServerEvent::MediaStateChange {
                        media_state,
                        sender_connection_id: connection_id,
                    },
                );
                debug!(
                    target: "signaling.actor.router",
                    connection_id = %connection_id,
                    room_id = %room_id,
                    recipients = delivered,
                    "Media state forwarded"
                );
            }
        }
    }

    fn handle_join(&mut self, connection_id: ConnectionId, room_id: RoomId, session_id: SessionId) {
        // A connection holds one room at a time.
        if let Some(ConnectionState::Joined(current)) = self.peer_state(connection_id) {
            if current != room_id {
                self.depart(connection_id);
            }
        }

        let outcome = self.rooms.join(&room_id, &session_id, connection_id);

        if let Some(old) = outcome.superseded {
            self.set_state(old, ConnectionState::Unjoined);
            metrics::record_session_superseded();
            info!(
                target: "signaling.actor.router",
                room_id = %room_id,
                session_id = %session_id,
                old_connection_id = %old,
                connection_id = %connection_id,
                "Session moved to a new connection"
            );
        }

        let others = self.rooms.list_others(&room_id, &session_id);

        // Same connection, new session: the old one has left the room.
        if let Some(old_session) = outcome.replaced_session {
            for (_, peer_connection) in &others {
                self.deliver(
                    *peer_connection,
                    ServerEvent::UserLeft {
                        session_id: old_session.clone(),
                        connection_id,
                    },
                );
            }
            info!(
                target: "signaling.actor.router",
                connection_id = %connection_id,
                room_id = %room_id,
                old_session_id = %old_session,
                session_id = %session_id,
                "Connection switched session within room"
            );
        }

        for (_, peer_connection) in &others {
            self.deliver(
                *peer_connection,
                ServerEvent::UserJoined {
                    session_id: session_id.clone(),
                    connection_id,
                },
            );
        }

        let mut session_ids: Vec<SessionId> = others.into_iter().map(|(s, _)| s).collect();
        session_ids.sort();
        self.deliver(
            connection_id,
            ServerEvent::CurrentParticipants { session_ids },
        );

        if let Some(previous) = self.sessions.register(session_id.clone(), connection_id) {
            debug!(
                target: "signaling.actor.router",
                session_id = %session_id,
                previous_connection_id = %previous,
                "Session registry entry replaced"
            );
        }

        self.set_state(connection_id, ConnectionState::Joined(room_id.clone()));

        info!(
            target: "signaling.actor.router",
            connection_id = %connection_id,
            session_id = %session_id,
            room_id = %room_id,
            participants = outcome.participant_count,
            "User joined room"
        );
        self.publish_gauges();
    }

    fn handle_leave_room(&mut self, connection_id: ConnectionId, room_id: &RoomId) {
        match self.peer_state(connection_id) {
            Some(ConnectionState::Joined(current)) if current == *room_id => {
                self.depart(connection_id);
                self.sessions.remove_by_connection(connection_id);
                self.set_state(connection_id, ConnectionState::Unjoined);
                self.publish_gauges();
            }
            _ => {
                debug!(
                    target: "signaling.actor.router",
                    connection_id = %connection_id,
                    room_id = %room_id,
                    "Leave for a room the connection is not in ignored"
                );
            }
        }
    }

    fn handle_disconnect(&mut self, connection_id: ConnectionId, reason: DisconnectReason) {
        if self.peers.remove(&connection_id).is_none() {
            debug!(
                target: "signaling.actor.router",
                connection_id = %connection_id,
                reason = reason.as_str(),
                "Disconnect for unknown connection ignored"
            );
            return;
        }

        let departure = self.depart(connection_id);
        let session_id = self.sessions.remove_by_connection(connection_id);
        metrics::record_disconnect(reason.label());

        info!(
            target: "signaling.actor.router",
            connection_id = %connection_id,
            session_id = ?session_id.as_ref().map(SessionId::as_str),
            room_id = ?departure.as_ref().map(|room| room.as_str().to_string()),
            reason = reason.as_str(),
            "Connection disconnected"
        );
        self.publish_gauges();
    }

    /// Remove a connection from its room and tell the remaining members.
    ///
    /// Returns the vacated room, if there was one.
    fn depart(&mut self, connection_id: ConnectionId) -> Option<RoomId> {
        let departure = self.rooms.leave(connection_id)?;

        for (_, remaining_connection) in &departure.remaining {
            self.deliver(
                *remaining_connection,
                ServerEvent::UserLeft {
                    session_id: departure.session_id.clone(),
                    connection_id,
                },
            );
        }

        info!(
            target: "signaling.actor.router",
            connection_id = %connection_id,
            session_id = %departure.session_id,
            room_id = %departure.room_id,
            remaining = departure.remaining.len(),
            room_closed = departure.room_closed,
            "User left room"
        );

        Some(departure.room_id)
    }

    /// Send `event` to every connection in `room_id` except the sender.
    ///
    /// Unknown rooms are dropped quietly. Returns the recipient count.
    fn forward(&self, sender: ConnectionId, room_id: &RoomId, event: &ServerEvent) -> usize {
        if !self.rooms.contains_room(room_id) {
            debug!(
                target: "signaling.actor.router",
                connection_id = %sender,
                room_id = %room_id,
                event = event.name(),
                "Message for unknown room dropped"
            );
            return 0;
        }

        let recipients = self.rooms.connections_except(room_id, sender);
        for recipient in &recipients {
            self.deliver(*recipient, event.clone());
        }

        metrics::record_messages_forwarded(event.name(), recipients.len());
        recipients.len()
    }

    /// Queue an event for one connection. Closed queues are ignored.
    fn deliver(&self, connection_id: ConnectionId, event: ServerEvent) {
        match self.peers.get(&connection_id) {
            Some(peer) => {
                if peer.outbound.send(event).is_err() {
                    debug!(
                        target: "signaling.actor.router",
                        connection_id = %connection_id,
                        "Outbound queue closed, disconnect pending"
                    );
                }
            }
            None => {
                debug!(
                    target: "signaling.actor.router",
                    connection_id = %connection_id,
                    event = event.name(),
                    "No outbound queue for connection"
                );
            }
        }
    }

    /// Report a handler-level failure to the originating connection.
    fn reject(&self, connection_id: ConnectionId, event_name: &str, error: &SignalingError) {
        warn!(
            target: "signaling.actor.router",
            connection_id = %connection_id,
            event = event_name,
            error = %error,
            "Rejected inbound event"
        );
        metrics::record_protocol_error(error.error_type());
        self.deliver(connection_id, ServerEvent::from_error(error));
    }

    fn peer_state(&self, connection_id: ConnectionId) -> Option<ConnectionState> {
        self.peers.get(&connection_id).map(|peer| peer.state.clone())
    }

    fn set_state(&mut self, connection_id: ConnectionId, state: ConnectionState) {
        if let Some(peer) = self.peers.get_mut(&connection_id) {
            peer.state = state;
        }
    }

    fn status(&self) -> RouterStatus {
        RouterStatus {
            rooms: self.rooms.snapshot(),
            total_connections: self.sessions.len(),
            open_connections: self.peers.len(),
            mailbox_depth: self.receiver.len(),
            messages_processed: self.mailbox.messages_processed(),
        }
    }

    fn publish_gauges(&self) {
        metrics::set_rooms_active(self.rooms.room_count());
        metrics::set_connections_active(self.peers.len());
    }

    /// Drop every outbound queue so socket writers finish.
    fn release_peers(&mut self) {
        let open = self.peers.len();
        self.peers.clear();
        if open > 0 {
            info!(
                target: "signaling.actor.router",
                released = open,
                "Released outbound queues"
            );
        }
        self.publish_gauges();
    }
}
