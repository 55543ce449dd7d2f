//! Lifecycle Controller
//!
//! Runs the FleetOps node lifecycle housekeeping:
//! - Commissioning timeout sweep: Commissioning nodes that have not changed
//!   for too long are moved to Failed tests
//! - Health, readiness and Prometheus metrics endpoints

mod backoff;
mod config;
mod controller;
mod error;
mod metrics;
mod probes;
mod sweeper;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting lifecycle controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace);
    info!(
        "  Commissioning timeout: {} minutes",
        config.commissioning_timeout_minutes
    );
    info!("  Sweep interval: {:?}", config.sweep_interval);
    info!("  Probe address: {}", config.probe_addr);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
