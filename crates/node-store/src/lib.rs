//! FleetOps node store
//!
//! Durable storage for NodeRecords and their MAC links.
//!
//! The lifecycle core only talks to the [`NodeStore`] trait. Two
//! implementations are provided:
//!
//! - [`KubeNodeStore`]: persists nodes as `Machine` custom resources and MAC
//!   links as `MacLink` custom resources. Status changes are optimistic
//!   compare-and-set patches guarded by the object's `resourceVersion`.
//! - `MemoryNodeStore` (feature `test-util`): an in-process store with
//!   per-call locking, used by unit and integration tests.
//!
//! # Invariants enforced here
//!
//! - `owner` is set iff the status is Allocated or Reserved; a
//!   compare-and-set that would break this is rejected.
//! - [`NodeStore::save`] never writes `status` or `owner`; only
//!   [`NodeStore::compare_and_set_status`] and the bulk sweep do.
//! - A MAC address is linked to at most one node across the fleet.

pub mod error;
pub mod kube_store;
pub mod mac;
pub mod models;
#[path = "trait.rs"]
pub mod store_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use error::StoreError;
pub use kube_store::KubeNodeStore;
pub use mac::MacAddress;
pub use models::*;
pub use store_trait::NodeStore;
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryNodeStore;
