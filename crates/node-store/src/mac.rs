//! MAC address parsing and normalisation
//!
//! Addresses are accepted as six hex octets separated consistently by `:` or
//! `-`, in any case, and are always stored and compared in lowercase colon
//! form.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A normalised MAC address (`aa:bb:cc:dd:ee:ff`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress(String);

impl MacAddress {
    /// Parse and normalise a MAC address
    pub fn parse(input: &str) -> Result<Self, StoreError> {
        let trimmed = input.trim();
        let separator = if trimmed.contains(':') { ':' } else { '-' };
        let octets: Vec<&str> = trimmed.split(separator).collect();
        let well_formed = octets.len() == 6
            && octets
                .iter()
                .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()));
        if !well_formed {
            return Err(StoreError::InvalidMac(input.to_string()));
        }
        Ok(Self(octets.join(":").to_lowercase()))
    }

    /// The normalised text form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MacAddress {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MacAddress {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.0
    }
}
