//! Metrics definitions for the signaling relay.
//!
//! All metrics follow Prometheus naming conventions:
//! - `signaling_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded by code, never by client input:
//! - `event`: protocol event names (~10 values)
//! - `error_type`: `SignalingError::error_type` values (6 values)
//! - `reason`: disconnect reasons (3 values)

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Router handling is in-memory; anything above a few ms is queueing
        .set_buckets_for_metric(
            Matcher::Prefix("signaling_event_latency".to_string()),
            &[
                0.0001, 0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set event latency buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

// ============================================================================
// Gauges
// ============================================================================

/// Metric: `signaling_rooms_active`
pub fn set_rooms_active(count: usize) {
    // usize to f64 conversion is safe for realistic room counts (< 2^53)
    #[allow(clippy::cast_precision_loss)]
    gauge!("signaling_rooms_active").set(count as f64);
}

/// Metric: `signaling_connections_active`
///
/// Open sockets known to the router, joined or not.
pub fn set_connections_active(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("signaling_connections_active").set(count as f64);
}

/// Metric: `signaling_actor_mailbox_depth`
///
/// High values mean the router is falling behind.
pub fn set_actor_mailbox_depth(depth: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("signaling_actor_mailbox_depth").set(depth as f64);
}

// ============================================================================
// Counters
// ============================================================================

/// Metric: `signaling_events_total`
/// Labels: `event`
pub fn record_event(event: &'static str) {
    counter!("signaling_events_total", "event" => event).increment(1);
}

/// Metric: `signaling_messages_forwarded_total`
/// Labels: `event`
///
/// Counts deliveries, so one offer into a room of four adds three.
pub fn record_messages_forwarded(event: &'static str, recipients: usize) {
    counter!("signaling_messages_forwarded_total", "event" => event)
        .increment(u64::try_from(recipients).unwrap_or(u64::MAX));
}

/// Metric: `signaling_protocol_errors_total`
/// Labels: `error_type`
pub fn record_protocol_error(error_type: &'static str) {
    counter!("signaling_protocol_errors_total", "error_type" => error_type).increment(1);
}

/// Metric: `signaling_disconnects_total`
/// Labels: `reason`
pub fn record_disconnect(reason: &'static str) {
    counter!("signaling_disconnects_total", "reason" => reason).increment(1);
}

/// Metric: `signaling_sessions_superseded_total`
///
/// A session joined from a new connection while its old one was still in the room.
pub fn record_session_superseded() {
    counter!("signaling_sessions_superseded_total").increment(1);
}

// ============================================================================
// Histograms
// ============================================================================

/// Metric: `signaling_event_latency_seconds`
/// Labels: `event`
///
/// Time from the socket reader handing the event over to the router
/// finishing its fan-out.
pub fn record_event_latency(event: &'static str, duration: Duration) {
    histogram!("signaling_event_latency_seconds", "event" => event)
        .record(duration.as_secs_f64());
}
