//! Prometheus metrics for the sweep loop.

use crate::error::ControllerError;
use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct SweepMetrics {
    registry: Registry,
    pub sweep_runs: IntCounter,
    pub sweep_errors: IntCounter,
    pub nodes_failed_commissioning: IntCounter,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, ControllerError> {
    let counter = IntCounter::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl SweepMetrics {
    pub fn new() -> Result<Self, ControllerError> {
        let registry = Registry::new();
        Ok(Self {
            sweep_runs: counter(
                &registry,
                "fleetops_sweep_runs_total",
                "Commissioning timeout sweeps run",
            )?,
            sweep_errors: counter(
                &registry,
                "fleetops_sweep_errors_total",
                "Commissioning timeout sweeps that failed",
            )?,
            nodes_failed_commissioning: counter(
                &registry,
                "fleetops_nodes_failed_commissioning_total",
                "Nodes moved to Failed tests by the commissioning timeout",
            )?,
            registry,
        })
    }

    /// Text exposition of every registered metric
    pub fn encode(&self) -> Result<String, ControllerError> {
        let mut output = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut output)?;
        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}
