//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (accept loop, one task per connection)
//!     → handler.rs (read once, state machine)
//!     → request.rs (parse, fingerprint.rs computes the cache key)
//!     → [cache lookup] ── hit ──→ cached bytes to client
//!     → forward.rs (HTTP/1.0 to origin, drain to EOF, store)
//!     → response bytes to client, close
//! ```

pub mod fingerprint;
pub mod forward;
pub mod handler;
pub mod request;
pub mod server;

pub use fingerprint::Fingerprint;
pub use forward::{ForwardError, Forwarder};
pub use handler::{ConnectionHandler, Outcome};
pub use request::{ParseError, Request};
pub use server::ProxyServer;
