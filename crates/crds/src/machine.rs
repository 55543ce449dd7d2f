//! Machine CRD
//!
//! One physical or virtual machine managed by FleetOps. `spec` holds the
//! descriptive attributes; lifecycle state lives in the status subresource
//! and is only written through compare-and-set patches.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "fleetops.microscaler.io",
    version = "v1alpha1",
    kind = "Machine",
    namespaced,
    status = "MachineStatus",
    shortname = "mach",
    printcolumn = r#"{"name":"Hostname","type":"string","jsonPath":".spec.hostname"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Owner","type":"string","jsonPath":".status.owner"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MachineSpec {
    /// Stable system identifier (also the object name)
    pub system_id: String,

    /// Hostname
    pub hostname: String,

    /// Architecture (e.g. "amd64", "armhf/highbank")
    #[serde(default)]
    pub architecture: String,

    /// Power driver type (empty for the default driver)
    #[serde(default)]
    pub power_type: String,

    /// Power driver parameters
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub power_parameters: BTreeMap<String, String>,

    /// Whether the machine boots from the network
    #[serde(default = "default_netboot")]
    pub netboot: bool,

    /// Enlistment timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

fn default_netboot() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct MachineStatus {
    /// Lifecycle phase
    pub phase: MachinePhase,

    /// Principal the machine is allocated or reserved to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Timestamp of the last lifecycle change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Machine lifecycle phase
///
/// Serializes as PascalCase ("Ready", "FailedTests", ...) and accepts the
/// lowercase spelling as well.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub enum MachinePhase {
    /// Enlisted, awaiting acceptance
    #[default]
    #[serde(alias = "declared")]
    Declared,

    /// Hardware inventory in progress
    #[serde(alias = "commissioning")]
    Commissioning,

    /// Commissioning failed or timed out
    #[serde(alias = "failedtests", alias = "failed-tests")]
    FailedTests,

    /// Available for acquisition
    #[serde(alias = "ready")]
    Ready,

    /// Allocated to an owner
    #[serde(alias = "allocated")]
    Allocated,

    /// Reserved for an owner
    #[serde(alias = "reserved")]
    Reserved,

    /// Retired from the fleet
    #[serde(alias = "retired")]
    Retired,
}
