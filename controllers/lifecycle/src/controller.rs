//! Main controller implementation.
//!
//! Wires the Kubernetes-backed node store into the lifecycle core and runs
//! the commissioning sweep next to the probe server.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::metrics::SweepMetrics;
use crate::probes::{self, ProbeState};
use crate::sweeper::Sweeper;
use kube::Client;
use lifecycle::{OwnershipPolicy, TransitionEngine};
use node_store::KubeNodeStore;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::task::JoinHandle;
use tracing::info;

/// Lifecycle controller tasks
pub struct Controller {
    sweeper: JoinHandle<Result<(), ControllerError>>,
    probes: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its tasks.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing lifecycle controller");

        let kube_client = Client::try_default().await?;
        let store = KubeNodeStore::new(kube_client, &config.namespace);
        let engine = TransitionEngine::new(
            Arc::new(store),
            Arc::new(OwnershipPolicy),
            config.lifecycle()?,
        );

        let metrics = SweepMetrics::new()?;
        let ready = Arc::new(AtomicBool::new(false));

        let sweeper = {
            let sweeper = Sweeper::new(
                engine,
                config.sweep_interval,
                metrics.clone(),
                ready.clone(),
            );
            tokio::spawn(async move { sweeper.run().await })
        };

        let probes = {
            let state = ProbeState { ready, metrics };
            let addr = config.probe_addr;
            tokio::spawn(async move { probes::serve(addr, state).await })
        };

        Ok(Self { sweeper, probes })
    }

    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Lifecycle controller running");

        tokio::select! {
            result = &mut self.sweeper => {
                result.map_err(|e| {
                    ControllerError::Task(format!("Commissioning sweep panicked: {}", e))
                })??;
            }
            result = &mut self.probes => {
                result
                    .map_err(|e| ControllerError::Task(format!("Probe server panicked: {}", e)))??;
            }
        }

        Err(ControllerError::Task("A controller task exited unexpectedly".to_string()))
    }
}
