//! Client-facing socket transport.

pub mod ws;

pub use ws::{serve_socket, TransportConfig};
