//! Signaling Service Library
//!
//! WebRTC signaling relay: keeps track of who is in which call room and
//! forwards offers, answers, ICE candidates, chat and media-state updates
//! between the participants of a room over WebSocket. Media never passes
//! through this service.
//!
//! # Architecture
//!
//! ```text
//! GET /ws ──▶ transport::ws (reader + writer task per socket)
//!                 │  RouterMessage           ▲ ServerEvent
//!                 ▼                          │
//!          SignalingRouterActor (single instance)
//!          ├── RoomTable        room -> participants/connections
//!          └── SessionRegistry  session <-> connection
//! ```
//!
//! All membership changes and fan-outs run on the router actor, one message
//! at a time. Nothing is persisted; clients re-join after a restart.
//!
//! # Modules
//!
//! - [`actors`] - router actor and its handle
//! - [`config`] - service configuration from environment
//! - [`errors`] - error types and client-safe messages
//! - [`protocol`] - wire events
//! - [`state`] - room table and session registry
//! - [`transport`] - WebSocket handling
//! - [`routes`] - HTTP surface
//! - [`observability`] - probes and metrics

pub mod actors;
pub mod config;
pub mod errors;
pub mod observability;
pub mod protocol;
pub mod routes;
pub mod state;
pub mod transport;
