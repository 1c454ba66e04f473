//! Per-connection request handling.
//!
//! Drives one client connection through the states of
//! [`ConnectionState`]: a single read, parse, cache check, optional forward,
//! respond, close.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::cache::{CacheLookup, CacheStore};
use crate::http::forward::Forwarder;
use crate::http::request::Request;
use crate::net::ConnectionState;
use crate::observability::metrics;

/// Size of the single client read. Longer requests are truncated.
pub const READ_BUFFER_SIZE: usize = 4096;

/// Payload written when the request cannot be parsed.
pub const BAD_REQUEST: &[u8] = b"400 Bad Request\n";

/// Payload written when the origin cannot be reached or its response cannot
/// be stored.
pub const UPSTREAM_FAILURE: &[u8] = b"500: Unable to connect to remote server\n";

/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Served from the cache without contacting the origin.
    CacheHit,
    /// Fetched from the origin and stored.
    Forwarded,
    /// Request could not be parsed; `400` payload sent.
    BadRequest,
    /// Origin unreachable or failed mid-transfer; `500` payload sent.
    UpstreamFailure,
    /// Cache index or object store failed. A failed lookup sends nothing, a
    /// failed store sends the `500` payload.
    CacheFailure,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::CacheHit => "cache_hit",
            Outcome::Forwarded => "forwarded",
            Outcome::BadRequest => "bad_request",
            Outcome::UpstreamFailure => "upstream_failure",
            Outcome::CacheFailure => "cache_failure",
        }
    }
}

/// Shared per-connection handler. Cheap to clone into each task.
#[derive(Clone)]
pub struct ConnectionHandler {
    cache: Arc<CacheStore>,
    forwarder: Forwarder,
}

impl ConnectionHandler {
    pub fn new(cache: Arc<CacheStore>) -> Self {
        let forwarder = Forwarder::new(Arc::clone(&cache));
        Self { cache, forwarder }
    }

    /// Handle one client connection from first read to close.
    pub async fn handle<S>(&self, mut stream: S) -> Outcome
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let outcome = self.process(&mut stream).await;

        enter(ConnectionState::Closed);
        if let Err(e) = stream.shutdown().await {
            tracing::trace!(error = %e, "Client shutdown failed");
        }
        metrics::record_request(outcome.as_str());
        outcome
    }

    async fn process<S>(&self, stream: &mut S) -> Outcome
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        enter(ConnectionState::Reading);
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let n = match stream.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(error = %e, "Client read failed");
                0
            }
        };
        buf.truncate(n);
        tracing::debug!(request = %String::from_utf8_lossy(&buf), "Got request");

        enter(ConnectionState::Parsing);
        let request = match Request::parse(&buf) {
            Ok(request) => request,
            Err(e) => {
                tracing::info!(error = %e, bytes = n, "Bad request");
                write_client(stream, BAD_REQUEST).await;
                return Outcome::BadRequest;
            }
        };

        let lookup = match self.cache.lookup(request.fingerprint()).await {
            Ok(lookup) => lookup,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    fingerprint = %request.fingerprint(),
                    "Cache lookup failed"
                );
                return Outcome::CacheFailure;
            }
        };

        if let CacheLookup::Hit(bytes) = lookup {
            enter(ConnectionState::CacheHit);
            tracing::info!(
                method = request.method(),
                host = request.host(),
                path = request.path(),
                bytes = bytes.len(),
                "Cache hit"
            );
            write_client(stream, &bytes).await;
            return Outcome::CacheHit;
        }

        enter(ConnectionState::CacheMiss);
        tracing::info!(
            method = request.method(),
            host = request.host(),
            path = request.path(),
            "Cache miss"
        );

        enter(ConnectionState::Forwarding);
        let response = match self.forwarder.forward(&request).await {
            Ok(response) => response,
            Err(e) if e.is_upstream() => {
                tracing::warn!(error = %e, "Upstream request failed");
                write_client(stream, UPSTREAM_FAILURE).await;
                return Outcome::UpstreamFailure;
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    fingerprint = %request.fingerprint(),
                    "Cache store failed"
                );
                write_client(stream, UPSTREAM_FAILURE).await;
                return Outcome::CacheFailure;
            }
        };

        enter(ConnectionState::Responding);
        tracing::debug!(response = %String::from_utf8_lossy(&response), "Relaying response");
        write_client(stream, &response).await;
        Outcome::Forwarded
    }
}

fn enter(state: ConnectionState) {
    tracing::trace!(state = %state, "Connection state");
}

/// Write to the client, ignoring failures: the client may already be gone.
async fn write_client<S>(stream: &mut S, bytes: &[u8])
where
    S: AsyncWrite + Unpin,
{
    if let Err(e) = stream.write_all(bytes).await {
        tracing::debug!(error = %e, "Client write failed");
    }
}
