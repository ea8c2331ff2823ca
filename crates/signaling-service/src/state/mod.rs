//! Membership state owned by the router actor.
//!
//! Neither table is shared: the [`SignalingRouterActor`](crate::actors::SignalingRouterActor)
//! owns both and mutates them one message at a time.

pub mod room_table;
pub mod session_registry;

pub use room_table::{Departure, JoinOutcome, RoomDetail, RoomTable};
pub use session_registry::SessionRegistry;
