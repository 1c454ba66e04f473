//! Caching forward proxy.
//!
//! Accepts plaintext HTTP requests in absolute form
//! (`GET http://host[:port]/path ...`), relays them to the origin over
//! HTTP/1.0 and caches each response by request fingerprint for a fixed TTL.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ net::listener ──▶ http::server ──▶ http::handler
//!                                                      │
//!                          ┌───────────────────────────┤
//!                          ▼                           ▼
//!                   http::request              cache::CacheStore
//!                   (parse, fingerprint)        ├─ index (redis | memory)
//!                                               └─ objects (files)
//!                                                      │ miss
//!                                                      ▼
//!                                               http::forward ──▶ Origin
//! ```

// Core subsystems
pub mod cache;
pub mod config;
pub mod http;
pub mod net;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use cache::CacheStore;
pub use config::ProxyConfig;
pub use http::ProxyServer;
pub use lifecycle::Shutdown;
