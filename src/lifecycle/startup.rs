//! Startup orchestration.
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The cache index is probed before the listener binds, so no client is
//!   accepted while the cache is unreachable

use std::sync::Arc;

use thiserror::Error;

use crate::cache::{CacheError, CacheStore};
use crate::config::ProxyConfig;
use crate::net::{Listener, ListenerError};
use crate::observability::metrics;

/// Fatal errors raised before the proxy starts serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("cache unavailable: {0}")]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("invalid metrics address `{0}`")]
    MetricsAddress(String),
}

/// Everything the server needs, initialized in dependency order.
pub struct Runtime {
    pub cache: Arc<CacheStore>,
    pub listener: Listener,
}

/// Connect and probe the cache described by `config`.
pub async fn init_cache(config: &ProxyConfig) -> Result<Arc<CacheStore>, StartupError> {
    let cache = CacheStore::connect(&config.cache).await?;
    cache.probe().await?;

    tracing::info!(
        index = cache.index_name(),
        directory = %cache.objects().dir().display(),
        ttl_secs = cache.ttl().as_secs(),
        "Cache ready"
    );
    Ok(Arc::new(cache))
}

/// Start metrics, the cache and the listener, in that order.
pub async fn start(config: &ProxyConfig) -> Result<Runtime, StartupError> {
    if config.observability.metrics_enabled {
        let addr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr);
    }

    let cache = init_cache(config).await?;
    let listener = Listener::bind(&config.listener).await?;

    Ok(Runtime { cache, listener })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexBackend;
    use tempfile::TempDir;

    #[tokio::test]
    async fn memory_backend_starts_without_services() {
        let dir = TempDir::new().unwrap();
        let mut config = ProxyConfig::default();
        config.cache.backend = IndexBackend::Memory;
        config.cache.directory = dir.path().join("temp");
        config.listener.host = "127.0.0.1".into();
        config.listener.port = 0;

        let runtime = start(&config).await.unwrap();
        assert!(runtime.listener.local_addr().unwrap().port() > 0);
        assert!(dir.path().join("temp").is_dir());
        assert_eq!(runtime.cache.index_name(), "memory");
    }

    #[tokio::test]
    async fn unreachable_redis_is_fatal() {
        // Bind and release a port so nothing is listening on it.
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let mut config = ProxyConfig::default();
        config.cache.redis_url = format!("redis://127.0.0.1:{port}/0");

        let err = match init_cache(&config).await {
            Err(err) => err,
            Ok(_) => panic!("startup should fail without a redis server"),
        };
        assert!(matches!(err, StartupError::Cache(CacheError::Index(_))));
    }
}
