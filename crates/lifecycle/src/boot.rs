//! Boot purpose of a node at network boot time.

use node_store::{NodeRecord, NodeStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a netbooting machine should do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootPurpose {
    /// Run the commissioning image (also used while enlisting)
    Commissioning,
    /// Install the operating system
    Install,
    /// Boot from local disk
    Local,
    /// Nothing to do, power off
    Poweroff,
}

impl BootPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            BootPurpose::Commissioning => "commissioning",
            BootPurpose::Install => "install",
            BootPurpose::Local => "local",
            BootPurpose::Poweroff => "poweroff",
        }
    }
}

impl fmt::Display for BootPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boot purpose for a machine; `None` is an unknown machine that is
/// enlisting
pub fn boot_purpose(node: Option<&NodeRecord>) -> BootPurpose {
    match node {
        None => BootPurpose::Commissioning,
        Some(node) => match node.status {
            NodeStatus::Commissioning => BootPurpose::Commissioning,
            NodeStatus::Allocated if node.netboot => BootPurpose::Install,
            NodeStatus::Allocated => BootPurpose::Local,
            _ => BootPurpose::Poweroff,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(status: NodeStatus, netboot: bool) -> NodeRecord {
        let mut node = NodeRecord::new("node-1", "host-1");
        node.status = status;
        node.netboot = netboot;
        if status.is_owned() {
            node.owner = Some("alice".to_string());
        }
        node
    }

    #[test]
    fn test_unknown_machine_commissions() {
        assert_eq!(boot_purpose(None), BootPurpose::Commissioning);
    }

    #[test]
    fn test_purpose_by_status() {
        assert_eq!(
            boot_purpose(Some(&node(NodeStatus::Commissioning, true))),
            BootPurpose::Commissioning
        );
        assert_eq!(
            boot_purpose(Some(&node(NodeStatus::Allocated, true))),
            BootPurpose::Install
        );
        assert_eq!(
            boot_purpose(Some(&node(NodeStatus::Allocated, false))),
            BootPurpose::Local
        );
        for status in [
            NodeStatus::Declared,
            NodeStatus::FailedTests,
            NodeStatus::Ready,
            NodeStatus::Reserved,
            NodeStatus::Retired,
        ] {
            assert_eq!(boot_purpose(Some(&node(status, true))), BootPurpose::Poweroff);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(BootPurpose::Install.to_string(), "install");
    }
}
