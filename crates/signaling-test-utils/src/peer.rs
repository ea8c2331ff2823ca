//! Fake peers connected directly to a router actor.

use common::types::ConnectionId;
use signaling_service::actors::{
    DisconnectReason, RouterConfig, SignalingRouterActor, SignalingRouterHandle,
};
use signaling_service::protocol::{ClientEvent, ServerEvent};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How long [`TestPeer::recv`] waits before failing the test.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Spawn a router with default settings for a test.
#[must_use]
pub fn spawn_router() -> SignalingRouterHandle {
    let (handle, _task) =
        SignalingRouterActor::spawn(RouterConfig::default(), CancellationToken::new());
    handle
}

/// Wait until the router has handled every message queued before this call.
pub async fn settle(router: &SignalingRouterHandle) {
    router
        .get_status()
        .await
        .expect("router should answer status queries");
}

/// A client connection without a socket.
///
/// Holds the receiving end of the outbound queue the router writes to, the
/// same queue a WebSocket writer task would drain.
pub struct TestPeer {
    pub connection_id: ConnectionId,
    rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl TestPeer {
    /// Register a new connection and consume its `connected` event.
    pub async fn connect(router: &SignalingRouterHandle) -> Self {
        let connection_id = ConnectionId::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        router
            .connect(connection_id, tx)
            .await
            .expect("router should accept connections");

        match tokio::time::timeout(RECV_TIMEOUT, rx.recv()).await {
            Ok(Some(ServerEvent::Connected { connection_id: id })) => {
                assert_eq!(id, connection_id, "connected event carries the assigned id");
            }
            other => panic!("expected connected event, got {other:?}"),
        }

        Self { connection_id, rx }
    }

    /// Dispatch `event` as if it arrived on this peer's socket.
    pub async fn send(&self, router: &SignalingRouterHandle, event: ClientEvent) {
        router
            .dispatch(self.connection_id, event)
            .await
            .expect("router should accept events");
    }

    /// Report this peer's socket as closed by the client.
    pub async fn close(self, router: &SignalingRouterHandle) {
        router
            .disconnect(self.connection_id, DisconnectReason::ClientClosed)
            .await
            .expect("router should accept disconnects");
    }

    /// Next event, failing the test if none arrives in time.
    pub async fn recv(&mut self) -> ServerEvent {
        match tokio::time::timeout(RECV_TIMEOUT, self.rx.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => panic!("outbound queue closed for {}", self.connection_id),
            Err(_) => panic!("no event for {} within {RECV_TIMEOUT:?}", self.connection_id),
        }
    }

    /// Everything already queued for this peer.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Settle the router, then drain.
    pub async fn drain_settled(&mut self, router: &SignalingRouterHandle) -> Vec<ServerEvent> {
        settle(router).await;
        self.drain()
    }

    /// Settle the router and assert nothing was delivered.
    pub async fn assert_silent(&mut self, router: &SignalingRouterHandle) {
        let events = self.drain_settled(router).await;
        assert!(
            events.is_empty(),
            "expected no events for {}, got {events:?}",
            self.connection_id
        );
    }

    /// True once the router has dropped this peer's queue.
    ///
    /// Discards any events still pending.
    pub async fn is_closed(&mut self) -> bool {
        loop {
            match tokio::time::timeout(RECV_TIMEOUT, self.rx.recv()).await {
                Ok(Some(_)) => {}
                Ok(None) => return true,
                Err(_) => return false,
            }
        }
    }
}
