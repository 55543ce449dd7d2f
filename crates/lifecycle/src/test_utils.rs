//! Test utilities for lifecycle unit tests
//!
//! Builds a [`LifecycleService`] over the in-memory store and the recording
//! power client, plus helpers for seeding nodes.

use crate::{Actor, LifecycleConfig, LifecycleService, OwnershipPolicy};
use chrono::{DateTime, Utc};
use node_store::{
    MacAddress, MacLink, MemoryNodeStore, NodeFilter, NodeRecord, NodeStatus, NodeStore,
    StoreError,
};
use power_client::MockPowerClient;
use std::sync::Arc;

/// Service plus handles on its test doubles
pub struct TestHarness {
    pub store: MemoryNodeStore,
    pub power: MockPowerClient,
    pub service: LifecycleService,
}

pub fn harness() -> TestHarness {
    harness_with_config(LifecycleConfig::default())
}

pub fn harness_with_config(config: LifecycleConfig) -> TestHarness {
    let store = MemoryNodeStore::new();
    let power = MockPowerClient::new();
    let service = LifecycleService::new(
        Arc::new(store.clone()),
        Arc::new(OwnershipPolicy),
        Arc::new(power.clone()),
        config,
    );
    TestHarness {
        store,
        power,
        service,
    }
}

/// Helper to create a test node; the owner is only kept for owned statuses
pub fn create_test_node(system_id: &str, status: NodeStatus, owner: Option<&str>) -> NodeRecord {
    let mut node = NodeRecord::new(system_id, format!("{system_id}.local"));
    node.status = status;
    node.architecture = "amd64".to_string();
    if status.is_owned() {
        node.owner = owner.map(str::to_string);
    }
    node
}

impl TestHarness {
    /// Seed a node straight into the store
    pub fn seed(&self, system_id: &str, status: NodeStatus, owner: Option<&str>) -> NodeRecord {
        let node = create_test_node(system_id, status, owner);
        self.store.insert(node.clone());
        node
    }

    /// Seed a node with MAC links
    pub async fn seed_with_macs(&self, system_id: &str, status: NodeStatus, macs: &[&str]) {
        self.seed(system_id, status, None);
        for mac in macs {
            let mac = MacAddress::parse(mac).unwrap();
            self.store.add_mac(system_id, &mac).await.unwrap();
        }
    }

    /// Current stored status of a node
    pub async fn status_of(&self, system_id: &str) -> NodeStatus {
        self.store.get(system_id).await.unwrap().unwrap().status
    }

    /// Current stored record of a node
    pub async fn record(&self, system_id: &str) -> NodeRecord {
        self.store.get(system_id).await.unwrap().unwrap()
    }
}

pub fn alice() -> Actor {
    Actor::user("alice")
}

pub fn bob() -> Actor {
    Actor::user("bob")
}

pub fn admin() -> Actor {
    Actor::admin("admin")
}

/// Store whose status compare-and-set always loses, as if another writer
/// touched the record between every read and write
#[derive(Clone, Default)]
pub struct ContendedStore {
    pub inner: MemoryNodeStore,
}

#[async_trait::async_trait]
impl NodeStore for ContendedStore {
    async fn get(&self, system_id: &str) -> Result<Option<NodeRecord>, StoreError> {
        self.inner.get(system_id).await
    }

    async fn list(&self, filter: &NodeFilter) -> Result<Vec<NodeRecord>, StoreError> {
        self.inner.list(filter).await
    }

    async fn create(&self, node: NodeRecord) -> Result<NodeRecord, StoreError> {
        self.inner.create(node).await
    }

    async fn save(&self, node: &NodeRecord) -> Result<NodeRecord, StoreError> {
        self.inner.save(node).await
    }

    async fn delete(&self, system_id: &str) -> Result<(), StoreError> {
        self.inner.delete(system_id).await
    }

    async fn compare_and_set_status(
        &self,
        _system_id: &str,
        _expected: NodeStatus,
        _next: NodeStatus,
        _owner: Option<&str>,
    ) -> Result<bool, StoreError> {
        Ok(false)
    }

    async fn bulk_set_status(
        &self,
        from: NodeStatus,
        updated_before: DateTime<Utc>,
        to: NodeStatus,
    ) -> Result<Vec<String>, StoreError> {
        self.inner.bulk_set_status(from, updated_before, to).await
    }

    async fn add_mac(&self, system_id: &str, mac: &MacAddress) -> Result<MacLink, StoreError> {
        self.inner.add_mac(system_id, mac).await
    }

    async fn remove_mac(&self, system_id: &str, mac: &MacAddress) -> Result<(), StoreError> {
        self.inner.remove_mac(system_id, mac).await
    }

    async fn list_macs(&self, system_id: &str) -> Result<Vec<MacLink>, StoreError> {
        self.inner.list_macs(system_id).await
    }

    async fn find_mac(&self, mac: &MacAddress) -> Result<Option<MacLink>, StoreError> {
        self.inner.find_mac(mac).await
    }
}
