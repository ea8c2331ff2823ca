//! WebSocket transport.
//!
//! Each accepted socket gets a fresh [`ConnectionId`] and two halves:
//!
//! - a reader loop (this task) that decodes text frames and hands events to
//!   the router, and
//! - a writer task that drains the connection's outbound queue onto the
//!   socket and sends a ping every `ping_interval`.
//!
//! A socket silent for `ping_timeout` (no frames, not even pongs) is treated
//! as dead. When the reader stops, the router is told about the disconnect;
//! the router then drops its end of the outbound queue, which lets the
//! writer flush, send a close frame and finish.

use crate::actors::{DisconnectReason, SignalingRouterHandle};
use crate::config;
use crate::errors::SignalingError;
use crate::observability::metrics;
use crate::protocol::{decode_client_event, ServerEvent};

use axum::extract::ws::{Message, WebSocket};
use common::types::ConnectionId;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// How long the writer may keep flushing after the reader has stopped.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Per-socket transport settings.
#[derive(Debug, Clone, Copy)]
pub struct TransportConfig {
    /// Largest inbound message accepted, in bytes.
    pub max_message_bytes: usize,
    /// Interval between server pings.
    pub ping_interval: Duration,
    /// Inbound silence after which the socket is closed.
    pub ping_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: config::DEFAULT_MAX_MESSAGE_BYTES,
            ping_interval: Duration::from_secs(config::DEFAULT_PING_INTERVAL_SECONDS),
            ping_timeout: Duration::from_secs(config::DEFAULT_PING_TIMEOUT_SECONDS),
        }
    }
}

/// Drive one accepted socket until it closes.
#[instrument(skip_all, name = "signaling.transport.ws", fields(connection_id = %connection_id))]
pub async fn serve_socket(
    socket: WebSocket,
    connection_id: ConnectionId,
    router: SignalingRouterHandle,
    config: TransportConfig,
    shutdown: CancellationToken,
) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<ServerEvent>();

    if let Err(e) = router.connect(connection_id, outbound_tx.clone()).await {
        warn!(
            target: "signaling.transport.ws",
            connection_id = %connection_id,
            error = %e,
            "Router refused connection"
        );
        return;
    }

    info!(
        target: "signaling.transport.ws",
        connection_id = %connection_id,
        "WebSocket connected"
    );

    let mut writer = tokio::spawn(write_loop(
        ws_sender,
        outbound_rx,
        config.ping_interval,
        connection_id,
    ));

    let reason = read_loop(
        &mut ws_receiver,
        &router,
        &outbound_tx,
        connection_id,
        config.ping_timeout,
        &shutdown,
    )
    .await;

    // The router holds the other sender; the writer finishes once both are gone.
    drop(outbound_tx);

    if let Err(e) = router.disconnect(connection_id, reason).await {
        debug!(
            target: "signaling.transport.ws",
            connection_id = %connection_id,
            error = %e,
            "Router gone before disconnect was reported"
        );
    }

    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
        .await
        .is_err()
    {
        debug!(
            target: "signaling.transport.ws",
            connection_id = %connection_id,
            "Writer did not drain in time, aborting"
        );
        writer.abort();
    }

    info!(
        target: "signaling.transport.ws",
        connection_id = %connection_id,
        reason = reason.as_str(),
        "WebSocket disconnected"
    );
}

/// Read frames until the socket closes, fails, times out or the server stops.
async fn read_loop(
    ws_receiver: &mut SplitStream<WebSocket>,
    router: &SignalingRouterHandle,
    outbound: &mpsc::UnboundedSender<ServerEvent>,
    connection_id: ConnectionId,
    ping_timeout: Duration,
    shutdown: &CancellationToken,
) -> DisconnectReason {
    loop {
        let next = tokio::select! {
            () = shutdown.cancelled() => return DisconnectReason::ServerShutdown,
            next = tokio::time::timeout(ping_timeout, ws_receiver.next()) => next,
        };

        let frame = match next {
            Err(_) => {
                warn!(
                    target: "signaling.transport.ws",
                    connection_id = %connection_id,
                    timeout_secs = ping_timeout.as_secs(),
                    "No traffic within ping timeout"
                );
                return DisconnectReason::TransportError;
            }
            Ok(None) => return DisconnectReason::ClientClosed,
            Ok(Some(Err(e))) => {
                warn!(
                    target: "signaling.transport.ws",
                    connection_id = %connection_id,
                    error = %e,
                    "WebSocket receive failed"
                );
                return DisconnectReason::TransportError;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Message::Text(text) => match decode_client_event(&text) {
                Ok(event) => {
                    if router.dispatch(connection_id, event).await.is_err() {
                        return DisconnectReason::ServerShutdown;
                    }
                }
                Err(e) => reject_frame(outbound, connection_id, &e),
            },
            Message::Binary(_) => {
                let e = SignalingError::Protocol("binary frames are not supported".to_string());
                reject_frame(outbound, connection_id, &e);
            }
            Message::Close(_) => return DisconnectReason::ClientClosed,
            // Pongs are answered by axum; any frame counts as liveness.
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}

fn reject_frame(
    outbound: &mpsc::UnboundedSender<ServerEvent>,
    connection_id: ConnectionId,
    error: &SignalingError,
) {
    debug!(
        target: "signaling.transport.ws",
        connection_id = %connection_id,
        error = %error,
        "Undecodable frame"
    );
    metrics::record_protocol_error(error.error_type());
    let _ = outbound.send(ServerEvent::from_error(error));
}

/// Drain the outbound queue onto the socket and keep it pinged.
async fn write_loop(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::UnboundedReceiver<ServerEvent>,
    ping_interval: Duration,
    connection_id: ConnectionId,
) {
    let mut ping = tokio::time::interval(ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately.
    ping.tick().await;

    loop {
        tokio::select! {
            event = outbound.recv() => {
                let Some(event) = event else {
                    let _ = ws_sender.send(Message::Close(None)).await;
                    break;
                };

                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        error!(
                            target: "signaling.transport.ws",
                            connection_id = %connection_id,
                            event = event.name(),
                            error = %e,
                            "Failed to serialize event"
                        );
                        continue;
                    }
                };

                if ws_sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }

            _ = ping.tick() => {
                if ws_sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}
