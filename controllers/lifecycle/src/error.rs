//! Controller-specific error types.
//!
//! This module defines error types specific to the lifecycle controller
//! that are not covered by the library crates' own errors.

use kube::Error as KubeError;
use lifecycle::LifecycleError;
use node_store::StoreError;
use thiserror::Error;

/// Errors that can occur in the lifecycle controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Node store error
    #[error("Node store error: {0}")]
    Store(#[from] StoreError),

    /// Lifecycle operation error
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Probe server failed
    #[error("Probe server failed: {0}")]
    Probe(#[from] std::io::Error),

    /// Background task ended unexpectedly
    #[error("Task failed: {0}")]
    Task(String),
}
