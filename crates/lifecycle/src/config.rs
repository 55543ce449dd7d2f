//! Lifecycle tunables.

use chrono::Duration;

/// Tunables for the lifecycle core
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Commissioning nodes untouched for longer than this fail their tests
    pub commissioning_timeout: Duration,
    /// Candidate-set refreshes an acquisition makes before giving up
    pub acquire_attempts: u32,
    /// Compare-and-set retries for a single-node transition
    pub transition_attempts: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            commissioning_timeout: Duration::minutes(60),
            acquire_attempts: 5,
            transition_attempts: 3,
        }
    }
}
