//! Mock PowerControl for unit testing
//!
//! Records every request in memory and can be told to refuse requests for
//! specific machines.

use crate::error::PowerError;
use crate::models::{PowerAction, PowerRequest};
use crate::power_trait::PowerControl;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One request seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPowerCall {
    pub system_id: String,
    pub action: PowerAction,
    pub user_data: Option<Vec<u8>>,
}

/// Recording power client
#[derive(Debug, Clone, Default)]
pub struct MockPowerClient {
    calls: Arc<Mutex<Vec<RecordedPowerCall>>>,
    refused: Arc<Mutex<HashSet<String>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockPowerClient {
    /// Create a new mock client
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every request for `system_id` (for test setup)
    pub fn refuse(&self, system_id: &str) {
        lock(&self.refused).insert(system_id.to_string());
    }

    /// Requests recorded so far
    pub fn calls(&self) -> Vec<RecordedPowerCall> {
        lock(&self.calls).clone()
    }

    fn record(
        &self,
        request: &PowerRequest,
        action: PowerAction,
        user_data: Option<&[u8]>,
    ) -> Result<(), PowerError> {
        if lock(&self.refused).contains(&request.system_id) {
            return Err(PowerError::Api(format!(
                "power agent refused {} for {}",
                action.as_str(),
                request.system_id
            )));
        }
        lock(&self.calls).push(RecordedPowerCall {
            system_id: request.system_id.clone(),
            action,
            user_data: user_data.map(<[u8]>::to_vec),
        });
        Ok(())
    }
}

#[async_trait::async_trait]
impl PowerControl for MockPowerClient {
    async fn request_start(
        &self,
        request: &PowerRequest,
        user_data: Option<&[u8]>,
    ) -> Result<(), PowerError> {
        self.record(request, PowerAction::PowerOn, user_data)
    }

    async fn request_stop(&self, request: &PowerRequest) -> Result<(), PowerError> {
        self.record(request, PowerAction::PowerOff, None)
    }
}
