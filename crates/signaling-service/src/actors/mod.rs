//! Actor that serializes all membership changes and message forwarding.
//!
//! ```text
//! WebSocket reader tasks ──RouterMessage──▶ SignalingRouterActor
//!                                            ├── RoomTable
//!                                            ├── SessionRegistry
//!                                            └── peers: ConnectionId -> outbound queue
//! SignalingRouterActor ──ServerEvent──▶ WebSocket writer tasks
//! ```

pub mod messages;
pub mod metrics;
pub mod router;

pub use messages::{DisconnectReason, Outbound, RouterMessage, RouterStatus};
pub use metrics::{MailboxLevel, MailboxMonitor};
pub use router::{RouterConfig, SignalingRouterActor, SignalingRouterHandle};
