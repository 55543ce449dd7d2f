//! Node store models
//!
//! The persisted shape of a node and its MAC links, independent of the
//! backend that stores them.

use crate::mac::MacAddress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Node lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Enlisted, awaiting acceptance
    Declared,
    /// Hardware inventory in progress
    Commissioning,
    /// Commissioning failed or timed out
    FailedTests,
    /// Available for acquisition
    Ready,
    /// Allocated to an owner
    Allocated,
    /// Reserved for an owner
    Reserved,
    /// Retired from the fleet
    Retired,
}

impl NodeStatus {
    /// Every status, in lifecycle order
    pub const ALL: [NodeStatus; 7] = [
        NodeStatus::Declared,
        NodeStatus::Commissioning,
        NodeStatus::FailedTests,
        NodeStatus::Ready,
        NodeStatus::Allocated,
        NodeStatus::Reserved,
        NodeStatus::Retired,
    ];

    /// Whether a node in this status must have an owner
    pub fn is_owned(self) -> bool {
        matches!(self, NodeStatus::Allocated | NodeStatus::Reserved)
    }

    /// Human readable name
    pub fn display_name(self) -> &'static str {
        match self {
            NodeStatus::Declared => "Declared",
            NodeStatus::Commissioning => "Commissioning",
            NodeStatus::FailedTests => "Failed tests",
            NodeStatus::Ready => "Ready",
            NodeStatus::Allocated => "Allocated",
            NodeStatus::Reserved => "Reserved",
            NodeStatus::Retired => "Retired",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A physical or virtual machine managed by the fleet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Stable unique identifier, immutable after creation
    pub system_id: String,
    pub hostname: String,
    pub status: NodeStatus,
    /// Requesting principal; set only while Allocated or Reserved
    pub owner: Option<String>,
    pub netboot: bool,
    pub architecture: String,
    pub power_type: String,
    pub power_parameters: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    /// Time of the last lifecycle change, used by the commissioning sweep
    pub updated_at: DateTime<Utc>,
}

impl NodeRecord {
    /// Create a Declared node with default descriptive attributes
    pub fn new(system_id: impl Into<String>, hostname: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            system_id: system_id.into(),
            hostname: hostname.into(),
            status: NodeStatus::Declared,
            owner: None,
            netboot: true,
            architecture: String::new(),
            power_type: String::new(),
            power_parameters: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Generate a fresh system_id (`node-<uuid>`)
    pub fn generate_system_id() -> String {
        format!("node-{}", uuid::Uuid::new_v4())
    }

    /// Status as shown to users, e.g. "Allocated to alice"
    pub fn display_status(&self) -> String {
        match (&self.owner, self.status.is_owned()) {
            (Some(owner), true) => format!("{} to {}", self.status.display_name(), owner),
            _ => self.status.display_name().to_string(),
        }
    }

    /// Whether the owner/status invariant holds for this record
    pub fn owner_consistent(&self) -> bool {
        self.owner.is_some() == self.status.is_owned()
    }
}

/// A MAC address attached to a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacLink {
    pub mac_address: MacAddress,
    /// Back-reference to the owning node
    pub system_id: String,
    /// Creation order; links of one node are listed by ascending sequence
    pub sequence: i64,
}

/// Filter for [`crate::NodeStore::list`]
///
/// Every populated field narrows the result; an empty filter matches all
/// nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeFilter {
    pub status: Option<NodeStatus>,
    pub system_ids: Option<Vec<String>>,
    pub owner: Option<String>,
    pub hostname: Option<String>,
    /// Only nodes linked to at least one of these MAC addresses
    pub mac_addresses: Option<Vec<MacAddress>>,
}

impl NodeFilter {
    /// Filter matching every node
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to a status
    #[must_use]
    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restrict to a set of system_ids
    #[must_use]
    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.system_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict to nodes owned by `owner`
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Restrict to nodes with this hostname
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Restrict to nodes linked to one of these MAC addresses
    #[must_use]
    pub fn with_mac_addresses(mut self, macs: Vec<MacAddress>) -> Self {
        self.mac_addresses = Some(macs);
        self
    }

    /// Check the record-local criteria. MAC criteria need the link table and
    /// are applied by the store.
    pub fn matches(&self, node: &NodeRecord) -> bool {
        if self.status.is_some_and(|s| s != node.status) {
            return false;
        }
        if let Some(ids) = &self.system_ids {
            if !ids.iter().any(|id| *id == node.system_id) {
                return false;
            }
        }
        if let Some(owner) = &self.owner {
            if node.owner.as_deref() != Some(owner.as_str()) {
                return false;
            }
        }
        if let Some(hostname) = &self.hostname {
            if node.hostname != *hostname {
                return false;
            }
        }
        true
    }
}

/// Sort nodes into creation order (ties broken by system_id)
pub fn sort_by_creation(nodes: &mut [NodeRecord]) {
    nodes.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.system_id.cmp(&b.system_id))
    });
}
