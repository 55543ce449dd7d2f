//! PowerControl trait for mocking
//!
//! The lifecycle core talks to this trait; the HTTP client implements it and
//! tests use a recording mock.

use crate::error::PowerError;
use crate::models::PowerRequest;

/// Power operations on a single machine
#[async_trait::async_trait]
pub trait PowerControl: Send + Sync {
    /// Ask for the machine to be powered on, optionally with user data for
    /// the booted system
    async fn request_start(
        &self,
        request: &PowerRequest,
        user_data: Option<&[u8]>,
    ) -> Result<(), PowerError>;

    /// Ask for the machine to be powered off
    async fn request_stop(&self, request: &PowerRequest) -> Result<(), PowerError>;
}
