//! MacLink CRD
//!
//! Attaches a MAC address to a Machine. The object name is the MAC address
//! with colons replaced by dashes, so creating a second link for the same
//! address is rejected by the API server.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "fleetops.microscaler.io",
    version = "v1alpha1",
    kind = "MacLink",
    namespaced,
    printcolumn = r#"{"name":"MAC","type":"string","jsonPath":".spec.macAddress"}"#,
    printcolumn = r#"{"name":"Machine","type":"string","jsonPath":".spec.systemId"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MacLinkSpec {
    /// MAC address (lowercase, colon separated)
    pub mac_address: String,

    /// system_id of the owning Machine
    pub system_id: String,

    /// Link sequence number, used for stable ordering
    #[serde(default)]
    pub sequence: i64,
}

/// Object name for a MacLink holding `mac_address`
pub fn mac_link_name(mac_address: &str) -> String {
    mac_address.to_lowercase().replace(':', "-")
}
