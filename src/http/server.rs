//! Proxy server: accept loop and connection dispatch.
//!
//! # Responsibilities
//! - Accept client connections from the bounded listener
//! - Spawn one task per connection running the [`ConnectionHandler`]
//! - Stop accepting on shutdown and drain in-flight connections

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::Instrument;

use crate::cache::CacheStore;
use crate::http::handler::ConnectionHandler;
use crate::net::{ConnectionTracker, Listener, ListenerError};

/// Forwarding proxy server.
pub struct ProxyServer {
    handler: ConnectionHandler,
    tracker: ConnectionTracker,
    drain_timeout: Duration,
}

impl ProxyServer {
    /// Create a server that serves and fills `cache`.
    pub fn new(cache: Arc<CacheStore>, drain_timeout: Duration) -> Self {
        Self {
            handler: ConnectionHandler::new(cache),
            tracker: ConnectionTracker::new(),
            drain_timeout,
        }
    }

    /// Run the accept loop until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, "Proxy server accepting connections");
        }

        loop {
            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
            };

            let (stream, peer, permit) = match accepted {
                Ok(accepted) => accepted,
                Err(ListenerError::Accept(e)) => {
                    tracing::warn!(error = %e, "Accept failed");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let guard = self.tracker.track();
            let handler = self.handler.clone();
            let span = tracing::info_span!("connection", id = %guard.id(), peer = %peer);

            tokio::spawn(
                async move {
                    let outcome = handler.handle(stream).await;
                    tracing::debug!(outcome = outcome.as_str(), "Connection closed");
                    drop(guard);
                    drop(permit);
                }
                .instrument(span),
            );
        }

        let in_flight = self.tracker.active_count();
        if in_flight > 0 {
            tracing::info!(in_flight, timeout_secs = self.drain_timeout.as_secs(), "Draining connections");
            if !self.tracker.wait_for_drain(self.drain_timeout).await {
                tracing::warn!(
                    remaining = self.tracker.active_count(),
                    "Drain timeout elapsed with connections still open"
                );
            }
        }

        tracing::info!("Proxy server stopped");
        Ok(())
    }
}
