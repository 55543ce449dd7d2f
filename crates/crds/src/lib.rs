//! FleetOps CRD Definitions
//!
//! Kubernetes Custom Resource Definitions backing the FleetOps node store.
//! A `Machine` holds one NodeRecord; a `MacLink` holds one MAC address
//! attached to a machine. MacLink objects are named after the normalised
//! MAC address so the API server enforces fleet-wide uniqueness.

pub mod machine;
pub mod mac_link;

pub use machine::*;
pub use mac_link::*;

/// API group shared by all FleetOps CRDs
pub const API_GROUP: &str = "fleetops.microscaler.io";

/// Label carrying the owning machine's system_id on MacLink objects
pub const SYSTEM_ID_LABEL: &str = "fleetops.microscaler.io/system-id";
