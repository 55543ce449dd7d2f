//! Lifecycle error types.
//!
//! Every operation of the lifecycle core fails with one of these kinds. The
//! API boundary maps them to transport responses; nothing here knows about
//! HTTP.

use node_store::{NodeStatus, StoreError};
use power_client::PowerError;
use thiserror::Error;

/// Errors returned by lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Requested edge is not in the transition table
    #[error("Invalid transition for node {system_id}: {from} -> {to}")]
    InvalidTransition {
        system_id: String,
        from: NodeStatus,
        to: NodeStatus,
    },

    /// Operation is not possible in the node's current state
    #[error("{0}")]
    NodeStateViolation(String),

    /// No node matches the acquisition constraints
    #[error("{0}")]
    NodesNotAvailable(String),

    /// Actor lacks the required capability
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Unknown node or MAC address
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Unknown identifiers in a batch request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Store(#[source] StoreError),

    /// Power agent failure
    #[error("Power control error: {0}")]
    Power(#[from] PowerError),
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => LifecycleError::NotFound(what),
            StoreError::InvalidMac(mac) => LifecycleError::ValidationError(format!(
                "Enter a valid MAC address (e.g. AA:BB:CC:DD:EE:FF), got '{mac}'."
            )),
            StoreError::AlreadyExists(what) => LifecycleError::ValidationError(what),
            other => LifecycleError::Store(other),
        }
    }
}

/// Result alias for lifecycle operations.
pub type Result<T> = std::result::Result<T, LifecycleError>;
