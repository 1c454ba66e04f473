//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! lookup(fingerprint)
//!     → index.rs (is there a live entry?)     ── no ──→ Miss
//!     → objects.rs (read <dir>/<fingerprint>) ──────→ Hit(bytes)
//!
//! store(fingerprint, bytes, ttl)
//!     → objects.rs (temp file + rename)
//!     → index.rs (marker with TTL, overwrites)
//! ```
//!
//! # Design Decisions
//! - An object is only served while its index entry is live
//! - Objects have no expiry of their own; a stale file is simply ignored
//!   until the next store overwrites it
//! - Index failures are never downgraded to a miss
//! - Concurrent stores of one key are last-writer-wins

pub mod index;
pub mod objects;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::{CacheConfig, IndexBackend};
use crate::http::Fingerprint;
use crate::observability::metrics;

pub use index::{CacheIndex, MemoryIndex, RedisIndex};
pub use objects::ObjectStore;

/// Failures of the cache index or object store.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache index unavailable: {0}")]
    Index(#[from] redis::RedisError),

    #[error("cached object {key} is unreadable: {source}")]
    ObjectRead {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write cached object {key}: {source}")]
    ObjectWrite {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cache directory unavailable: {0}")]
    Directory(#[source] std::io::Error),
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(Vec<u8>),
    Miss,
}

/// Index + object store pair shared by every connection.
pub struct CacheStore {
    index: Arc<dyn CacheIndex>,
    objects: ObjectStore,
    ttl: Duration,
}

impl CacheStore {
    pub fn new(index: Arc<dyn CacheIndex>, objects: ObjectStore, ttl: Duration) -> Self {
        Self { index, objects, ttl }
    }

    /// Build the store described by `config`, connecting to the index service.
    pub async fn connect(config: &CacheConfig) -> Result<Self, CacheError> {
        let index: Arc<dyn CacheIndex> = match config.backend {
            IndexBackend::Redis => Arc::new(RedisIndex::connect(&config.redis_url).await?),
            IndexBackend::Memory => Arc::new(MemoryIndex::new()),
        };
        Ok(Self::new(
            index,
            ObjectStore::new(&config.directory),
            config.ttl(),
        ))
    }

    /// Lifetime given to new index entries.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn index_name(&self) -> &'static str {
        self.index.name()
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    /// Verify the index is reachable and the object directory exists.
    pub async fn probe(&self) -> Result<(), CacheError> {
        self.index.ping().await?;
        self.objects.ensure_dir().await.map_err(CacheError::Directory)
    }

    /// Find a live cached response for `fingerprint`.
    pub async fn lookup(&self, fingerprint: Fingerprint) -> Result<CacheLookup, CacheError> {
        let key = fingerprint.to_string();

        if !self.index.contains(&key).await? {
            metrics::record_cache_lookup(false);
            return Ok(CacheLookup::Miss);
        }

        let bytes = self
            .objects
            .read(&key)
            .await
            .map_err(|source| CacheError::ObjectRead { key, source })?;
        metrics::record_cache_lookup(true);
        Ok(CacheLookup::Hit(bytes))
    }

    /// Save `bytes` for `fingerprint`, valid for `ttl`.
    pub async fn store(
        &self,
        fingerprint: Fingerprint,
        bytes: &[u8],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let key = fingerprint.to_string();

        self.objects
            .write(&key, bytes)
            .await
            .map_err(|source| CacheError::ObjectWrite {
                key: key.clone(),
                source,
            })?;
        self.index.mark(&key, ttl).await?;

        tracing::debug!(key = %key, bytes = bytes.len(), ttl_secs = ttl.as_secs(), "Cache entry stored");
        Ok(())
    }
}
