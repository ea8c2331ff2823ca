//! Test utilities for the signaling relay.
//!
//! This crate provides:
//! - [`TestPeer`] - a fake client wired straight to a router actor
//! - Event fixtures for building well-formed [`ClientEvent`]s
//! - [`settle`] to wait until the router has processed everything queued
//!
//! # Example
//!
//! ```rust,ignore
//! use signaling_test_utils::{fixtures, spawn_router, TestPeer};
//!
//! #[tokio::test]
//! async fn offer_reaches_peer() {
//!     let router = spawn_router();
//!     let mut alice = TestPeer::connect(&router).await;
//!     let mut bob = TestPeer::connect(&router).await;
//!
//!     alice.send(&router, fixtures::join("room-1", "alice")).await;
//!     bob.send(&router, fixtures::join("room-1", "bob")).await;
//!     alice.send(&router, fixtures::offer("room-1")).await;
//!
//!     let events = bob.drain_settled(&router).await;
//! }
//! ```
//!
//! [`ClientEvent`]: signaling_service::protocol::ClientEvent

pub mod fixtures;
mod peer;

pub use peer::{settle, spawn_router, TestPeer};
