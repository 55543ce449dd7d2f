//! Input validation for enlistment and node updates.

use crate::error::{LifecycleError, Result};
use node_store::MacAddress;
use std::collections::BTreeSet;

/// Architectures a node may declare
pub const ARCHITECTURES: [&str; 3] = ["i386", "amd64", "armhf/highbank"];

/// Supported power drivers; the empty string selects the fleet default
pub const POWER_TYPES: [&str; 4] = ["", "virsh", "ether_wake", "ipmi"];

pub const DEFAULT_ARCHITECTURE: &str = "i386";

const MAX_HOSTNAME_LEN: usize = 255;

pub fn validate_architecture(architecture: &str) -> Result<()> {
    if ARCHITECTURES.contains(&architecture) {
        Ok(())
    } else {
        Err(LifecycleError::ValidationError(format!(
            "Unknown architecture '{architecture}' (expected one of: {}).",
            ARCHITECTURES.join(", ")
        )))
    }
}

pub fn validate_power_type(power_type: &str) -> Result<()> {
    if POWER_TYPES.contains(&power_type) {
        Ok(())
    } else {
        Err(LifecycleError::ValidationError(format!(
            "Unknown power type '{power_type}'."
        )))
    }
}

pub fn validate_hostname(hostname: &str) -> Result<()> {
    let valid = !hostname.is_empty()
        && hostname.len() <= MAX_HOSTNAME_LEN
        && hostname
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'));
    if valid {
        Ok(())
    } else {
        Err(LifecycleError::ValidationError(format!(
            "Invalid hostname '{hostname}'."
        )))
    }
}

pub fn parse_mac(input: &str) -> Result<MacAddress> {
    MacAddress::parse(input).map_err(|_| {
        LifecycleError::ValidationError(format!(
            "Enter a valid MAC address (e.g. AA:BB:CC:DD:EE:FF), got '{input}'."
        ))
    })
}

/// Parse and normalise a list of MAC addresses
///
/// At least one address is required. Duplicates (after normalisation) are
/// collapsed; the first occurrence keeps its position.
pub fn parse_mac_list<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<MacAddress>> {
    if inputs.is_empty() {
        return Err(LifecycleError::ValidationError(
            "At least one MAC address is required.".to_string(),
        ));
    }
    let mut seen = BTreeSet::new();
    let mut macs = Vec::with_capacity(inputs.len());
    for input in inputs {
        let mac = parse_mac(input.as_ref())?;
        if seen.insert(mac.clone()) {
            macs.push(mac);
        }
    }
    Ok(macs)
}
