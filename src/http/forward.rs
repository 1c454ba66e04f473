//! Upstream forwarding.
//!
//! # Responsibilities
//! - Open a fresh TCP connection to the origin named by the request
//! - Send the HTTP/1.0 rendition of the request
//! - Drain the response until the origin closes the connection
//! - Hand successful responses to the cache
//!
//! # Design Decisions
//! - No pooling, no retries, no timeouts: one connection per request
//! - The response boundary is end-of-stream, never `Content-Length`

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::cache::{CacheError, CacheStore};
use crate::http::request::Request;
use crate::observability::metrics;

/// Why a request could not be relayed.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to connect to {authority}: {source}")]
    Connect {
        authority: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to send request to {authority}: {source}")]
    Write {
        authority: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read response from {authority}: {source}")]
    Read {
        authority: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl ForwardError {
    /// Whether the failure happened talking to the origin rather than the cache.
    pub fn is_upstream(&self) -> bool {
        !matches!(self, ForwardError::Cache(_))
    }
}

/// Relays requests to their origin and records the responses.
#[derive(Clone)]
pub struct Forwarder {
    cache: Arc<CacheStore>,
}

impl Forwarder {
    pub fn new(cache: Arc<CacheStore>) -> Self {
        Self { cache }
    }

    /// Send `request` to its origin and return the full response bytes.
    ///
    /// On success the bytes are stored under the request fingerprint before
    /// they are returned.
    pub async fn forward(&self, request: &Request) -> Result<Vec<u8>, ForwardError> {
        let authority = request.authority();
        let start = Instant::now();

        let mut upstream = TcpStream::connect(authority.as_str())
            .await
            .map_err(|source| ForwardError::Connect {
                authority: authority.clone(),
                source,
            })?;

        let wire = request.to_wire();
        tracing::debug!(
            upstream = %authority,
            request = %String::from_utf8_lossy(&wire),
            "Sending to remote"
        );

        upstream
            .write_all(&wire)
            .await
            .map_err(|source| ForwardError::Write {
                authority: authority.clone(),
                source,
            })?;

        let mut response = Vec::new();
        upstream
            .read_to_end(&mut response)
            .await
            .map_err(|source| ForwardError::Read {
                authority: authority.clone(),
                source,
            })?;
        metrics::record_upstream(start);

        tracing::debug!(
            upstream = %authority,
            bytes = response.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Response received"
        );

        self.cache
            .store(request.fingerprint(), &response, self.cache.ttl())
            .await?;

        Ok(response)
    }
}
