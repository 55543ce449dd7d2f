//! FleetOps lifecycle core
//!
//! Owns the node status machine and every operation that changes or reads
//! it: enlistment, acceptance, acquisition, release, power requests, MAC
//! links and the commissioning timeout sweep.
//!
//! # Invariants
//!
//! - A status changes only along an edge of [`transition::allowed_targets`]
//!   and only through [`TransitionEngine`], as a compare-and-set on the
//!   status the decision was made from.
//! - A node has an owner iff it is Allocated or Reserved.
//! - Concurrent acquisitions never allocate the same node twice.
//! - A MAC address belongs to at most one node.
//!
//! # Example
//!
//! ```rust,no_run
//! use lifecycle::{
//!     Actor, AllocationConstraint, LifecycleConfig, LifecycleService, OwnershipPolicy,
//! };
//! use node_store::MemoryNodeStore;
//! use power_client::PowerAgentClient;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = LifecycleService::new(
//!     Arc::new(MemoryNodeStore::new()),
//!     Arc::new(OwnershipPolicy),
//!     Arc::new(PowerAgentClient::new("http://power-agent:5240".to_string(), None)?),
//!     LifecycleConfig::default(),
//! );
//! let node = service
//!     .acquisition()
//!     .acquire(&Actor::user("alice"), &AllocationConstraint::any())
//!     .await?;
//! println!("acquired {}", node.system_id);
//! # Ok(())
//! # }
//! ```

pub mod acquisition;
pub mod actor;
pub mod authz;
pub mod boot;
pub mod command;
pub mod config;
pub mod enlistment;
pub mod error;
pub mod links;
pub mod nodes;
pub mod service;
pub mod transition;
pub mod validation;

#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod links_test;
#[cfg(test)]
mod nodes_test;

pub use acquisition::{AcquisitionCoordinator, AllocationConstraint};
pub use actor::Actor;
pub use authz::{Authorization, Capability, OwnershipPolicy};
pub use boot::{BootPurpose, boot_purpose};
pub use command::{Command, Outcome};
pub use config::LifecycleConfig;
pub use enlistment::{EnlistRequest, EnlistmentWorkflow};
pub use error::{LifecycleError, Result};
pub use links::LinkManager;
pub use nodes::{NodeManager, NodeQuery, NodeUpdate};
pub use service::LifecycleService;
pub use transition::TransitionEngine;
