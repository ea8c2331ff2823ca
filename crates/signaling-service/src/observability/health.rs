//! Liveness and readiness probes.
//!
//! - `GET /health` - 200 while the router actor is running, 503 once it has
//!   been cancelled or shut down.
//! - `GET /ready` - 200 once startup has marked the service ready and the
//!   router is running. It drops to 503 as soon as shutdown begins, so load
//!   balancers stop routing new sockets here while existing ones drain.
//!
//! `/ws` uses the same readiness check to refuse upgrades.

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Probe state shared between `main`, the `/ws` handler and the probes.
#[derive(Debug)]
pub struct HealthState {
    accepting: AtomicBool,
    /// Child of the router's token; cancelled when the router stops.
    router: CancellationToken,
}

impl HealthState {
    /// Probe state tied to a running router, not yet accepting sockets.
    #[must_use]
    pub fn new(router: CancellationToken) -> Self {
        Self {
            accepting: AtomicBool::new(false),
            router,
        }
    }

    /// Startup finished; accept sockets.
    pub fn set_ready(&self) {
        self.accepting.store(true, Ordering::SeqCst);
    }

    /// Shutting down; stop taking new sockets.
    pub fn set_not_ready(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.router.is_cancelled()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.accepting.load(Ordering::SeqCst) && self.is_live()
    }
}

/// Router with `/health` and `/ready`.
pub fn health_router(health_state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(liveness_handler))
        .route("/ready", get(readiness_handler))
        .with_state(health_state)
}

fn status_for(healthy: bool) -> StatusCode {
    if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn liveness_handler(State(state): State<Arc<HealthState>>) -> StatusCode {
    status_for(state.is_live())
}

async fn readiness_handler(State(state): State<Arc<HealthState>>) -> StatusCode {
    status_for(state.is_ready())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    async fn get_status_code(state: Arc<HealthState>, uri: &str) -> StatusCode {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");

        health_router(state)
            .oneshot(request)
            .await
            .expect("Failed to execute request")
            .status()
    }

    #[test]
    fn test_ready_requires_startup_and_running_router() {
        let router = CancellationToken::new();
        let state = HealthState::new(router.child_token());
        assert!(state.is_live());
        assert!(!state.is_ready(), "not ready before startup completes");

        state.set_ready();
        assert!(state.is_ready());

        state.set_not_ready();
        assert!(!state.is_ready());
        assert!(state.is_live(), "draining does not affect liveness");
    }

    #[test]
    fn test_router_stop_clears_liveness_and_readiness() {
        let router = CancellationToken::new();
        let state = HealthState::new(router.child_token());
        state.set_ready();

        router.cancel();

        assert!(!state.is_live());
        assert!(!state.is_ready(), "ready flag alone is not enough");
    }

    #[tokio::test]
    async fn test_liveness_endpoint_follows_router() {
        let router = CancellationToken::new();
        let state = Arc::new(HealthState::new(router.child_token()));
        assert_eq!(get_status_code(Arc::clone(&state), "/health").await, StatusCode::OK);

        router.cancel();
        assert_eq!(
            get_status_code(state, "/health").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_readiness_endpoint_follows_state() {
        let state = Arc::new(HealthState::new(CancellationToken::new()));
        assert_eq!(
            get_status_code(Arc::clone(&state), "/ready").await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        state.set_ready();
        assert_eq!(get_status_code(Arc::clone(&state), "/ready").await, StatusCode::OK);

        state.set_not_ready();
        assert_eq!(get_status_code(state, "/ready").await, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unknown_path_returns_404() {
        let state = Arc::new(HealthState::new(CancellationToken::new()));
        assert_eq!(get_status_code(state, "/unknown").await, StatusCode::NOT_FOUND);
    }
}
