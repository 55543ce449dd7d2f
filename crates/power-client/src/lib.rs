//! Power agent client
//!
//! Hands power-on and power-off requests for machines to the power agent.
//! Requests are fire-and-forget: a call returns once the agent has accepted
//! the request, not once the machine's power state has changed.
//!
//! # Example
//!
//! ```no_run
//! use power_client::{PowerAgentClient, PowerControl, PowerRequest};
//! use std::collections::BTreeMap;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PowerAgentClient::new("http://power-agent:5248".to_string(), None)?;
//! let request = PowerRequest {
//!     system_id: "node-1".to_string(),
//!     power_type: "ipmi".to_string(),
//!     power_parameters: BTreeMap::from([("power_address".to_string(), "10.0.0.5".to_string())]),
//! };
//! client.request_start(&request, Some(b"#cloud-config\n")).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod power_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::PowerAgentClient;
pub use error::PowerError;
pub use models::*;
pub use power_trait::PowerControl;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockPowerClient, RecordedPowerCall};
