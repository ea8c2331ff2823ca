//! Signaling Service
//!
//! WebRTC signaling relay over WebSocket.
//!
//! # Startup Flow
//!
//! 1. Initialize tracing from `RUST_LOG` / `SIGNALING_LOG_JSON`
//! 2. Load configuration from environment
//! 3. Initialize Prometheus metrics recorder
//! 4. Spawn the router actor
//! 5. Bind the HTTP listener (`/ws`, `/health`, `/ready`, `/status`, `/metrics`)
//! 6. Mark ready and wait for a shutdown signal
//!
//! # Shutdown
//!
//! Readiness drops first, then open sockets are told to stop reading, the
//! listener drains, and finally the router actor stops. Each wait is bounded
//! by `SIGNALING_SHUTDOWN_GRACE_SECONDS`.

#![warn(clippy::pedantic)]

use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::config::ObservabilityConfig;
use signaling_service::actors::{RouterConfig, SignalingRouterActor};
use signaling_service::config::Config;
use signaling_service::observability::{init_metrics_recorder, HealthState};
use signaling_service::routes::{build_routes, AppState};
use signaling_service::transport::TransportConfig;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How often shutdown checks whether every socket has disconnected.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let started_at = Instant::now();
    let vars: HashMap<String, String> = env::vars().collect();

    init_tracing(&ObservabilityConfig::from_vars(&vars));

    info!("Starting Signaling Service");

    // Load configuration
    let config = Config::from_vars(&vars).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        frontend_url = %config.frontend_url,
        router_channel_buffer = config.router_channel_buffer,
        max_message_bytes = config.max_message_bytes,
        ping_interval_secs = config.ping_interval.as_secs(),
        ping_timeout_secs = config.ping_timeout.as_secs(),
        json_logs = config.observability.json_logs,
        "Configuration loaded successfully"
    );

    // Must happen before any metrics are recorded
    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;
    info!("Prometheus metrics recorder initialized");

    let (router, router_task) = SignalingRouterActor::spawn(
        RouterConfig {
            channel_buffer: config.router_channel_buffer,
            candidate_log_every: config.candidate_log_every,
        },
        CancellationToken::new(),
    );
    info!("Router actor started");

    let health_state = Arc::new(HealthState::new(router.child_token()));

    // Sockets and the listener stop on this token; the router outlives them
    // so their disconnects are still processed.
    let shutdown_token = router.child_token();

    let state = AppState {
        router: router.clone(),
        health: Arc::clone(&health_state),
        transport: TransportConfig {
            max_message_bytes: config.max_message_bytes,
            ping_interval: config.ping_interval,
            ping_timeout: config.ping_timeout,
        },
        shutdown: shutdown_token.clone(),
        started_at,
    };

    let app = build_routes(state, metrics_handle, &config.frontend_url).map_err(|e| {
        error!(error = %e, "Failed to build routes");
        e
    })?;

    // Bind listener BEFORE spawning to fail fast on bind errors
    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %config.bind_address, "Failed to bind listener");
            format!("Failed to bind listener to {}: {e}", config.bind_address)
        })?;

    let server_shutdown = shutdown_token.clone();
    let addr = config.bind_address;
    let mut server_task = tokio::spawn(async move {
        info!(addr = %addr, "HTTP server starting");
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            server_shutdown.cancelled().await;
            info!("HTTP server shutting down");
        });
        if let Err(e) = server.await {
            error!(error = %e, "HTTP server failed");
        }
    });

    health_state.set_ready();
    info!(addr = %addr, "Signaling Service running - press Ctrl+C to shutdown");

    shutdown_signal().await;

    info!("Shutdown signal received, initiating graceful shutdown...");

    // Mark as not ready immediately so no new sockets arrive
    health_state.set_not_ready();
    shutdown_token.cancel();

    if tokio::time::timeout(config.shutdown_grace, &mut server_task)
        .await
        .is_err()
    {
        warn!(
            grace_secs = config.shutdown_grace.as_secs(),
            "HTTP server did not drain within grace period"
        );
        server_task.abort();
    }

    // Socket tasks report their disconnects before the router stops
    match tokio::time::timeout(
        config.shutdown_grace,
        router.wait_for_no_connections(DRAIN_POLL_INTERVAL),
    )
    .await
    {
        Ok(Ok(())) => info!("All sockets drained"),
        Ok(Err(e)) => warn!(error = %e, "Router unavailable while draining sockets"),
        Err(_) => warn!(
            grace_secs = config.shutdown_grace.as_secs(),
            "Sockets still open after grace period"
        ),
    }

    if let Err(e) = router.shutdown().await {
        warn!(error = %e, "Router shutdown error");
    }

    if tokio::time::timeout(config.shutdown_grace, router_task)
        .await
        .is_err()
    {
        warn!("Router actor did not stop within grace period");
    }

    info!("Signaling Service shutdown complete");
    Ok(())
}

/// Install the global tracing subscriber.
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new(common::config::DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
