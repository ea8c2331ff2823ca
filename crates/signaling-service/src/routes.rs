//! HTTP routes for the signaling relay.
//!
//! Defines the Axum router and application state.

use crate::actors::SignalingRouterHandle;
use crate::errors::SignalingError;
use crate::observability::{health_router, HealthState};
use crate::state::RoomDetail;
use crate::transport::{serve_socket, TransportConfig};

use axum::{
    extract::{State, WebSocketUpgrade},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use common::types::{ConnectionId, RoomId};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, warn};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Router actor handle.
    pub router: SignalingRouterHandle,

    /// Probe state; `/ws` refuses upgrades while not ready.
    pub health: Arc<HealthState>,

    /// Per-socket transport settings.
    pub transport: TransportConfig,

    /// Cancelled on shutdown; open sockets stop reading.
    pub shutdown: CancellationToken,

    /// Process start, for `uptimeSeconds`.
    pub started_at: Instant,
}

/// Body of `GET /status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub rooms: usize,
    pub total_connections: usize,
    pub room_details: BTreeMap<RoomId, RoomDetail>,
}

/// Build the application routes.
///
/// - `/ws` - signaling socket
/// - `/health`, `/ready` - probes
/// - `/status` - room membership snapshot
/// - `/metrics` - Prometheus metrics
/// - TraceLayer for request logging
/// - CORS restricted to the frontend origin
///
/// # Errors
///
/// Returns [`SignalingError::Config`] if `frontend_url` is not a valid origin.
pub fn build_routes(
    state: AppState,
    metrics_handle: PrometheusHandle,
    frontend_url: &str,
) -> Result<Router, SignalingError> {
    let origin = HeaderValue::from_str(frontend_url)
        .map_err(|e| SignalingError::Config(format!("invalid FRONTEND_URL: {e}")))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    let probe_routes = health_router(Arc::clone(&state.health));

    let metrics_routes = Router::new().route(
        "/metrics",
        get(move || {
            let handle = metrics_handle.clone();
            async move { handle.render() }
        }),
    );

    let signaling_routes = Router::new()
        .route("/ws", get(ws_handler))
        .route("/status", get(status_handler))
        .with_state(state);

    Ok(signaling_routes
        .merge(probe_routes)
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors))
}

/// Upgrade to a signaling socket.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if !state.health.is_ready() {
        debug!(target: "signaling.transport.ws", "Upgrade refused while not ready");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let connection_id = ConnectionId::new();
    let AppState {
        router,
        transport,
        shutdown,
        ..
    } = state;

    ws.max_message_size(transport.max_message_bytes)
        .on_failed_upgrade(move |e| {
            warn!(
                target: "signaling.transport.ws",
                connection_id = %connection_id,
                error = %e,
                "WebSocket upgrade failed"
            );
        })
        .on_upgrade(move |socket| serve_socket(socket, connection_id, router, transport, shutdown))
}

/// Read-only membership snapshot.
async fn status_handler(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    let status = state.router.get_status().await.map_err(|e| {
        warn!(target: "signaling.routes", error = %e, "Status query failed");
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    Ok(Json(StatusResponse {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        rooms: status.room_count(),
        total_connections: status.total_connections,
        room_details: status.rooms,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }
}
