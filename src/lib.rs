//! rPDU-Exporter library
//!
//! This crate provides the core functionality for discovering the sensor
//! topology of Raritan power distribution units via the vendor JSON-RPC
//! bulk interface and exporting sensor readings in Prometheus format.

pub mod cli;
pub mod config;
pub mod error;
pub mod exporter;
pub mod metrics;
pub mod model;
pub mod pdu;
pub mod rpc;
pub mod server;
pub mod utils;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Name prefix shared by every exported sensor metric
pub const EXPORTER_PREFIX: &str = "raritan_sensors";

/// Default listen port of the metrics endpoint
pub const DEFAULT_PORT: u16 = 9840;

/// Initialize the logging subsystem
///
/// # Arguments
/// * `level` - Log level string (trace, debug, info, warn, error)
///
/// # Errors
/// Returns an error if the logging system fails to initialize
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
