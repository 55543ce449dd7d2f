//! Periodic commissioning timeout sweep.

use crate::backoff::FibonacciBackoff;
use crate::error::ControllerError;
use crate::metrics::SweepMetrics;
use chrono::{DateTime, Utc};
use lifecycle::TransitionEngine;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info};

const MAX_ERROR_BACKOFF: Duration = Duration::from_secs(600);

pub struct Sweeper {
    engine: TransitionEngine,
    interval: Duration,
    metrics: SweepMetrics,
    ready: Arc<AtomicBool>,
}

impl Sweeper {
    pub fn new(
        engine: TransitionEngine,
        interval: Duration,
        metrics: SweepMetrics,
        ready: Arc<AtomicBool>,
    ) -> Self {
        Self {
            engine,
            interval,
            metrics,
            ready,
        }
    }

    /// Run one sweep as of `now`, returning the nodes that failed commissioning
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<Vec<String>, ControllerError> {
        self.metrics.sweep_runs.inc();
        match self.engine.bulk_status_sweep(now).await {
            Ok(failed) => {
                self.metrics
                    .nodes_failed_commissioning
                    .inc_by(failed.len() as u64);
                if !self.ready.swap(true, Ordering::SeqCst) {
                    info!("First sweep completed, controller is ready");
                }
                Ok(failed)
            }
            Err(e) => {
                self.metrics.sweep_errors.inc();
                Err(e.into())
            }
        }
    }

    /// Sweep forever; failed sweeps are retried with Fibonacci backoff
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("Commissioning sweep running every {:?}", self.interval);
        let mut backoff =
            FibonacciBackoff::new(self.interval, MAX_ERROR_BACKOFF.max(self.interval));
        loop {
            let delay = match self.run_once(Utc::now()).await {
                Ok(_) => {
                    backoff.reset();
                    self.interval
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    error!("Commissioning sweep failed, retrying in {:?}: {}", delay, e);
                    delay
                }
            };
            tokio::time::sleep(delay).await;
        }
    }
}
