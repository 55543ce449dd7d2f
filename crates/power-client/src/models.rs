//! Power agent models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters stored with a machine that the agent does not accept on its
/// driver command line
const IGNORED_POWER_OPTIONS: [&str; 4] = ["power_id", "system_id", "boot_mode", "power_off_mode"];

/// Drivers that do not take a MAC address argument
const NO_MAC_DRIVERS: [&str; 2] = ["lxd", "virsh"];

/// Power action requested from the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerAction {
    PowerOn,
    PowerOff,
}

impl PowerAction {
    /// Path segment used by the agent API
    pub fn as_str(self) -> &'static str {
        match self {
            PowerAction::PowerOn => "power_on",
            PowerAction::PowerOff => "power_off",
        }
    }
}

/// The machine a power request is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerRequest {
    pub system_id: String,
    pub power_type: String,
    pub power_parameters: BTreeMap<String, String>,
}

/// Request body sent to the power agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PowerParam {
    pub system_id: String,
    pub action: PowerAction,
    pub power_type: String,
    pub params: BTreeMap<String, String>,
    /// Base64-encoded user data for the booted system
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
}

impl PowerParam {
    /// Build the agent request for `action` on `request`
    pub fn new(request: &PowerRequest, action: PowerAction, user_data: Option<String>) -> Self {
        Self {
            system_id: request.system_id.clone(),
            action,
            power_type: request.power_type.clone(),
            params: driver_params(&request.power_type, &request.power_parameters),
            user_data,
        }
    }
}

/// Strip parameters the driver does not take and tidy string values
///
/// Empty values are dropped, embedded newlines removed and surrounding
/// whitespace trimmed.
pub fn driver_params(
    power_type: &str,
    params: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    params
        .iter()
        .filter(|(key, _)| !IGNORED_POWER_OPTIONS.contains(&key.as_str()))
        .filter(|(key, _)| !(key.as_str() == "mac_address" && NO_MAC_DRIVERS.contains(&power_type)))
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key.clone(), value.replace('\n', "").trim().to_string()))
        .collect()
}
