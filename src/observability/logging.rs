//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` sets the base filter; the debug flag still raises this crate
//!   to `debug` on top of it

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "cache_proxy=debug"
    } else {
        "cache_proxy=info"
    }
}

/// Filter directives for an optional `RUST_LOG` value and the debug flag.
///
/// Later directives win in `EnvFilter`, so the debug directive is appended.
pub fn filter_directives(env: Option<&str>, debug: bool) -> String {
    match env.map(str::trim).filter(|env| !env.is_empty()) {
        Some(env) if debug => format!("{env},{}", default_filter(true)),
        Some(env) => env.to_string(),
        None => default_filter(debug).to_string(),
    }
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logging(config: &ObservabilityConfig) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directives = filter_directives(env.as_deref(), config.debug);
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|e| {
        eprintln!("Ignoring invalid {}: {e}", EnvFilter::DEFAULT_ENV);
        EnvFilter::new(default_filter(config.debug))
    });

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}
