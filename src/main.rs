//! rPDU-Exporter - High-performance Raritan PDU metrics exporter
//!
//! This binary provides a Prometheus-compatible metrics endpoint that
//! polls Raritan power distribution units over the vendor JSON-RPC bulk
//! interface.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use rpdu_exporter::{cli::Cli, config::Config, server};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Cli::parse();

    // Initialize logging
    rpdu_exporter::init_logging(&args.log_level.to_string())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting rPDU-Exporter"
    );

    // Load configuration
    info!(path = %args.config.display(), "Loading configuration file");
    let mut config = Config::load(&args.config)?;

    // CLI overrides
    let port = args.port.unwrap_or(config.server.port);
    if let Some(bind_address) = args.bind_address {
        config.server.bind_address = bind_address;
    }
    if let Some(metrics_path) = args.metrics_path {
        if !metrics_path.starts_with('/') {
            anyhow::bail!("Metrics path must start with '/': {metrics_path}");
        }
        config.server.path = metrics_path;
    }

    if args.validate {
        println!("Configuration OK: {} PDU(s) configured", config.pdus.len());
        return Ok(());
    }

    // Start server
    server::run(config, port).await?;

    Ok(())
}
