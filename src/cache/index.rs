//! Cache index backends.
//!
//! The index only records that a fingerprint has a live cached response and
//! when that record expires. The response bytes themselves live in the object
//! store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::time::Instant;

use crate::cache::CacheError;

/// Value written for every index entry. Only presence matters.
const INDEX_MARKER: i32 = 1;

/// Existence + expiry records keyed by fingerprint.
#[async_trait]
pub trait CacheIndex: Send + Sync {
    /// Whether `key` has an unexpired entry.
    async fn contains(&self, key: &str) -> Result<bool, CacheError>;

    /// Create or overwrite the entry for `key`, expiring after `ttl`.
    async fn mark(&self, key: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Check that the backing service is reachable.
    async fn ping(&self) -> Result<(), CacheError>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

/// Index kept in a Redis server.
#[derive(Clone)]
pub struct RedisIndex {
    conn: MultiplexedConnection,
}

impl RedisIndex {
    /// Open a multiplexed connection to the server at `url`.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheIndex for RedisIndex {
    async fn contains(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        // A nil reply is the "no such key" answer, not a failure.
        let value: Option<String> = conn.get(key).await?;
        Ok(value.is_some())
    }

    async fn mark(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, INDEX_MARKER, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Index held in process memory.
///
/// Expired entries are removed lazily when they are looked up.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    entries: Arc<DashMap<String, Instant>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheIndex for MemoryIndex {
    async fn contains(&self, key: &str) -> Result<bool, CacheError> {
        let now = Instant::now();
        let live = match self.entries.get(key) {
            Some(expires_at) => *expires_at > now,
            None => return Ok(false),
        };
        if !live {
            self.entries.remove_if(key, |_, expires_at| *expires_at <= now);
        }
        Ok(live)
    }

    async fn mark(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), Instant::now() + ttl);
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
