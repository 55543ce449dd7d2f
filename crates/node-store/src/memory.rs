//! In-memory NodeStore for testing
//!
//! Stores nodes and MAC links in process memory. Each call takes the locks it
//! needs for its whole duration, so compare-and-set and MAC uniqueness hold
//! under concurrent callers. Locks are always taken in the order
//! `nodes` then `mac_links`.

use crate::error::StoreError;
use crate::mac::MacAddress;
use crate::models::{sort_by_creation, MacLink, NodeFilter, NodeRecord, NodeStatus};
use crate::store_trait::{check_owner, NodeStore};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// In-memory node store
///
/// Cloning shares the underlying storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryNodeStore {
    nodes: Arc<Mutex<HashMap<String, NodeRecord>>>,
    mac_links: Arc<Mutex<HashMap<MacAddress, MacLink>>>,
    // Counter for MAC link ordering
    next_sequence: Arc<Mutex<i64>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryNodeStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node verbatim, replacing any existing record (for test setup)
    pub fn insert(&self, node: NodeRecord) {
        lock(&self.nodes).insert(node.system_id.clone(), node);
    }

    /// Overwrite a node's `updated_at` (for test setup)
    pub fn set_updated_at(&self, system_id: &str, updated_at: DateTime<Utc>) {
        if let Some(node) = lock(&self.nodes).get_mut(system_id) {
            node.updated_at = updated_at;
        }
    }

    /// Snapshot of every stored node
    pub fn snapshot(&self) -> Vec<NodeRecord> {
        let mut nodes: Vec<NodeRecord> = lock(&self.nodes).values().cloned().collect();
        sort_by_creation(&mut nodes);
        nodes
    }

    fn next_sequence(&self) -> i64 {
        let mut seq = lock(&self.next_sequence);
        *seq += 1;
        *seq
    }
}

#[async_trait::async_trait]
impl NodeStore for MemoryNodeStore {
    async fn get(&self, system_id: &str) -> Result<Option<NodeRecord>, StoreError> {
        Ok(lock(&self.nodes).get(system_id).cloned())
    }

    async fn list(&self, filter: &NodeFilter) -> Result<Vec<NodeRecord>, StoreError> {
        let nodes = lock(&self.nodes);
        let linked: Option<Vec<String>> = filter.mac_addresses.as_ref().map(|macs| {
            let links = lock(&self.mac_links);
            macs.iter()
                .filter_map(|mac| links.get(mac).map(|l| l.system_id.clone()))
                .collect()
        });

        let mut results: Vec<NodeRecord> = nodes
            .values()
            .filter(|node| filter.matches(node))
            .filter(|node| {
                linked
                    .as_ref()
                    .is_none_or(|ids| ids.contains(&node.system_id))
            })
            .cloned()
            .collect();
        sort_by_creation(&mut results);
        Ok(results)
    }

    async fn create(&self, node: NodeRecord) -> Result<NodeRecord, StoreError> {
        check_owner(node.status, node.owner.as_deref())?;
        let mut nodes = lock(&self.nodes);
        if nodes.contains_key(&node.system_id) {
            return Err(StoreError::AlreadyExists(format!("Node {}", node.system_id)));
        }
        nodes.insert(node.system_id.clone(), node.clone());
        debug!("Created node {}", node.system_id);
        Ok(node)
    }

    async fn save(&self, node: &NodeRecord) -> Result<NodeRecord, StoreError> {
        let mut nodes = lock(&self.nodes);
        let stored = nodes
            .get_mut(&node.system_id)
            .ok_or_else(|| StoreError::NotFound(format!("Node {}", node.system_id)))?;
        stored.hostname.clone_from(&node.hostname);
        stored.architecture.clone_from(&node.architecture);
        stored.power_type.clone_from(&node.power_type);
        stored.power_parameters.clone_from(&node.power_parameters);
        stored.netboot = node.netboot;
        Ok(stored.clone())
    }

    async fn delete(&self, system_id: &str) -> Result<(), StoreError> {
        let mut nodes = lock(&self.nodes);
        if nodes.remove(system_id).is_none() {
            return Err(StoreError::NotFound(format!("Node {system_id}")));
        }
        lock(&self.mac_links).retain(|_, link| link.system_id != system_id);
        debug!("Deleted node {}", system_id);
        Ok(())
    }

    async fn compare_and_set_status(
        &self,
        system_id: &str,
        expected: NodeStatus,
        next: NodeStatus,
        owner: Option<&str>,
    ) -> Result<bool, StoreError> {
        check_owner(next, owner)?;
        let mut nodes = lock(&self.nodes);
        let node = nodes
            .get_mut(system_id)
            .ok_or_else(|| StoreError::NotFound(format!("Node {system_id}")))?;
        if node.status != expected {
            return Ok(false);
        }
        node.status = next;
        node.owner = owner.map(str::to_string);
        node.updated_at = Utc::now();
        Ok(true)
    }

    async fn bulk_set_status(
        &self,
        from: NodeStatus,
        updated_before: DateTime<Utc>,
        to: NodeStatus,
    ) -> Result<Vec<String>, StoreError> {
        check_owner(to, None)?;
        let mut nodes = lock(&self.nodes);
        let now = Utc::now();
        let mut affected: Vec<String> = nodes
            .values_mut()
            .filter(|node| node.status == from && node.updated_at <= updated_before)
            .map(|node| {
                node.status = to;
                node.owner = None;
                node.updated_at = now;
                node.system_id.clone()
            })
            .collect();
        affected.sort();
        Ok(affected)
    }

    async fn add_mac(&self, system_id: &str, mac: &MacAddress) -> Result<MacLink, StoreError> {
        let nodes = lock(&self.nodes);
        if !nodes.contains_key(system_id) {
            return Err(StoreError::NotFound(format!("Node {system_id}")));
        }
        let mut links = lock(&self.mac_links);
        if let Some(existing) = links.get(mac) {
            return Err(StoreError::AlreadyExists(format!(
                "MAC address {} is already linked to {}",
                mac, existing.system_id
            )));
        }
        let link = MacLink {
            mac_address: mac.clone(),
            system_id: system_id.to_string(),
            sequence: self.next_sequence(),
        };
        links.insert(mac.clone(), link.clone());
        Ok(link)
    }

    async fn remove_mac(&self, system_id: &str, mac: &MacAddress) -> Result<(), StoreError> {
        let mut links = lock(&self.mac_links);
        match links.get(mac) {
            Some(link) if link.system_id == system_id => {
                links.remove(mac);
                Ok(())
            }
            _ => Err(StoreError::NotFound(format!(
                "MAC address {mac} on node {system_id}"
            ))),
        }
    }

    async fn list_macs(&self, system_id: &str) -> Result<Vec<MacLink>, StoreError> {
        let mut links: Vec<MacLink> = lock(&self.mac_links)
            .values()
            .filter(|link| link.system_id == system_id)
            .cloned()
            .collect();
        links.sort_by_key(|link| link.sequence);
        Ok(links)
    }

    async fn find_mac(&self, mac: &MacAddress) -> Result<Option<MacLink>, StoreError> {
        Ok(lock(&self.mac_links).get(mac).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn mac(s: &str) -> MacAddress {
        MacAddress::parse(s).unwrap()
    }

    fn node_with_status(id: &str, status: NodeStatus, owner: Option<&str>) -> NodeRecord {
        let mut node = NodeRecord::new(id, id);
        node.status = status;
        node.owner = owner.map(str::to_string);
        node
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_system_id() {
        let store = MemoryNodeStore::new();
        store.create(NodeRecord::new("node-1", "a")).await.unwrap();
        let err = store.create(NodeRecord::new("node-1", "b")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_compare_and_set_only_from_expected_status() {
        let store = MemoryNodeStore::new();
        store.insert(node_with_status("node-1", NodeStatus::Ready, None));

        let swapped = store
            .compare_and_set_status(
                "node-1",
                NodeStatus::Ready,
                NodeStatus::Allocated,
                Some("alice"),
            )
            .await
            .unwrap();
        assert!(swapped);

        let again = store
            .compare_and_set_status("node-1", NodeStatus::Ready, NodeStatus::Allocated, Some("bob"))
            .await
            .unwrap();
        assert!(!again);

        let node = store.get("node-1").await.unwrap().unwrap();
        assert_eq!(node.status, NodeStatus::Allocated);
        assert_eq!(node.owner.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_compare_and_set_rejects_owner_mismatch() {
        let store = MemoryNodeStore::new();
        store.insert(node_with_status("node-1", NodeStatus::Ready, None));

        let err = store
            .compare_and_set_status("node-1", NodeStatus::Ready, NodeStatus::Allocated, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRequest(_)));

        let err = store
            .compare_and_set_status("node-1", NodeStatus::Ready, NodeStatus::Retired, Some("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_save_does_not_touch_status_or_owner() {
        let store = MemoryNodeStore::new();
        store.insert(node_with_status("node-1", NodeStatus::Allocated, Some("alice")));

        let mut edited = store.get("node-1").await.unwrap().unwrap();
        edited.hostname = "renamed".to_string();
        edited.status = NodeStatus::Ready;
        edited.owner = None;
        let saved = store.save(&edited).await.unwrap();

        assert_eq!(saved.hostname, "renamed");
        assert_eq!(saved.status, NodeStatus::Allocated);
        assert_eq!(saved.owner.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_bulk_set_status_respects_cutoff() {
        let store = MemoryNodeStore::new();
        store.insert(node_with_status("node-old", NodeStatus::Commissioning, None));
        store.insert(node_with_status("node-new", NodeStatus::Commissioning, None));
        store.insert(node_with_status("node-ready", NodeStatus::Ready, None));
        let now = Utc::now();
        store.set_updated_at("node-old", now - Duration::hours(2));
        store.set_updated_at("node-ready", now - Duration::hours(2));

        let affected = store
            .bulk_set_status(
                NodeStatus::Commissioning,
                now - Duration::hours(1),
                NodeStatus::FailedTests,
            )
            .await
            .unwrap();

        assert_eq!(affected, vec!["node-old".to_string()]);
        assert_eq!(store.get("node-old").await.unwrap().unwrap().status, NodeStatus::FailedTests);
        assert_eq!(store.get("node-new").await.unwrap().unwrap().status, NodeStatus::Commissioning);
        assert_eq!(store.get("node-ready").await.unwrap().unwrap().status, NodeStatus::Ready);
    }

    #[tokio::test]
    async fn test_mac_links_are_unique_and_ordered() {
        let store = MemoryNodeStore::new();
        store.insert(NodeRecord::new("node-1", "a"));
        store.insert(NodeRecord::new("node-2", "b"));

        store.add_mac("node-1", &mac("00:00:00:00:00:02")).await.unwrap();
        store.add_mac("node-1", &mac("00:00:00:00:00:01")).await.unwrap();
        let err = store.add_mac("node-2", &mac("00:00:00:00:00:01")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));

        let links = store.list_macs("node-1").await.unwrap();
        let addrs: Vec<&str> = links.iter().map(|l| l.mac_address.as_str()).collect();
        assert_eq!(addrs, vec!["00:00:00:00:00:02", "00:00:00:00:00:01"]);
    }

    #[tokio::test]
    async fn test_remove_mac_requires_link_on_that_node() {
        let store = MemoryNodeStore::new();
        store.insert(NodeRecord::new("node-1", "a"));
        store.insert(NodeRecord::new("node-2", "b"));
        store.add_mac("node-1", &mac("00:00:00:00:00:01")).await.unwrap();

        let err = store.remove_mac("node-2", &mac("00:00:00:00:00:01")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        store.remove_mac("node-1", &mac("00:00:00:00:00:01")).await.unwrap();
        assert!(store.find_mac(&mac("00:00:00:00:00:01")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_links_and_list_filters_by_mac() {
        let store = MemoryNodeStore::new();
        store.insert(NodeRecord::new("node-1", "a"));
        store.insert(NodeRecord::new("node-2", "b"));
        store.add_mac("node-1", &mac("00:00:00:00:00:01")).await.unwrap();
        store.add_mac("node-2", &mac("00:00:00:00:00:02")).await.unwrap();

        let by_mac = store
            .list(&NodeFilter::all().with_mac_addresses(vec![mac("00:00:00:00:00:02")]))
            .await
            .unwrap();
        assert_eq!(by_mac.len(), 1);
        assert_eq!(by_mac[0].system_id, "node-2");

        store.delete("node-2").await.unwrap();
        assert!(store.find_mac(&mac("00:00:00:00:00:02")).await.unwrap().is_none());
        assert!(matches!(store.delete("node-2").await, Err(StoreError::NotFound(_))));
    }
}
