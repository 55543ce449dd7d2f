//! Node store errors

use thiserror::Error;

/// Errors that can occur when reading or writing the node store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record already exists (duplicate system_id or MAC address)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Record changed underneath the writer
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Malformed MAC address
    #[error("Invalid MAC address: {0}")]
    InvalidMac(String),

    /// Write rejected because it would break a store invariant
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
