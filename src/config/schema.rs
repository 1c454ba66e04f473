//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the caching proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, connection limits).
    pub listener: ListenerConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Port to listen on. The CLI port argument takes precedence.
    pub port: u16,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// How long in-flight connections may run after shutdown is requested.
    pub drain_timeout_secs: u64,
}

impl ListenerConfig {
    /// The `host:port` string handed to the socket layer.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_connections: 10_000,
            drain_timeout_secs: 30,
        }
    }
}

/// Which service keeps the cache index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// Shared Redis server; entries expire through `SET ... EX`.
    #[default]
    Redis,
    /// In-process map; entries are lost when the proxy exits.
    Memory,
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Index backend.
    pub backend: IndexBackend,

    /// Redis connection URL, used when `backend = "redis"`.
    pub redis_url: String,

    /// Directory holding the cached response bytes.
    pub directory: PathBuf,

    /// Lifetime of an index entry in seconds.
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Redis,
            redis_url: "redis://localhost:6379/0".to_string(),
            directory: PathBuf::from("./temp"),
            ttl_secs: 300,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log line format.
    pub log_format: LogFormat,

    /// Echo raw request and response bytes at debug level.
    pub debug: bool,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Address for the Prometheus scrape endpoint.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            debug: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
