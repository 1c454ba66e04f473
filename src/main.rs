use std::path::PathBuf;

use clap::Parser;

use cache_proxy::config::{load_config, ProxyConfig};
use cache_proxy::lifecycle::{startup, Shutdown};
use cache_proxy::observability::logging;
use cache_proxy::ProxyServer;

#[derive(Parser)]
#[command(name = "cache-proxy")]
#[command(about = "Caching HTTP forward proxy", long_about = None)]
struct Cli {
    /// Port to listen on
    port: u16,

    /// Log raw request and response bytes
    #[arg(short, long)]
    debug: bool,

    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    config.listener.port = cli.port;
    config.observability.debug |= cli.debug;

    logging::init_logging(&config.observability);
    tracing::info!("cache-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let runtime = match startup::start(&config).await {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    shutdown.trigger_on_signal();

    let server = ProxyServer::new(runtime.cache, config.listener.drain_timeout());
    server.run(runtime.listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
