//! Observability for the signaling relay: probes and Prometheus metrics.
//!
//! Instrumentation logs connection, session and room identifiers, which are
//! opaque routing keys. SDP bodies, ICE candidates and chat text are never
//! logged; only their type and size.
//!
//! # Metrics
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `signaling_rooms_active` | Gauge | none |
//! | `signaling_connections_active` | Gauge | none |
//! | `signaling_actor_mailbox_depth` | Gauge | none |
//! | `signaling_events_total` | Counter | `event` |
//! | `signaling_messages_forwarded_total` | Counter | `event` |
//! | `signaling_protocol_errors_total` | Counter | `error_type` |
//! | `signaling_disconnects_total` | Counter | `reason` |
//! | `signaling_sessions_superseded_total` | Counter | none |
//! | `signaling_event_latency_seconds` | Histogram | `event` |

pub mod health;
pub mod metrics;

pub use health::{health_router, HealthState};
pub use metrics::init_metrics_recorder;
