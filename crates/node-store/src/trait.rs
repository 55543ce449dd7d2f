//! NodeStore trait
//!
//! Abstracts the durable node store so the lifecycle core can run against
//! Kubernetes in production and an in-memory store in tests.

use crate::error::StoreError;
use crate::mac::MacAddress;
use crate::models::{MacLink, NodeFilter, NodeRecord, NodeStatus};
use chrono::{DateTime, Utc};

/// Storage operations consumed by the lifecycle core
///
/// Every mutating call is atomic for the record it touches. All async
/// methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait NodeStore: Send + Sync {
    /// Fetch a node by system_id
    async fn get(&self, system_id: &str) -> Result<Option<NodeRecord>, StoreError>;

    /// List nodes matching `filter`, in creation order
    async fn list(&self, filter: &NodeFilter) -> Result<Vec<NodeRecord>, StoreError>;

    /// Insert a new node. Fails with `AlreadyExists` on a duplicate system_id.
    async fn create(&self, node: NodeRecord) -> Result<NodeRecord, StoreError>;

    /// Persist the descriptive attributes of an existing node
    /// (hostname, architecture, power settings, netboot).
    ///
    /// `status`, `owner` and the timestamps are left untouched.
    async fn save(&self, node: &NodeRecord) -> Result<NodeRecord, StoreError>;

    /// Delete a node together with its MAC links
    async fn delete(&self, system_id: &str) -> Result<(), StoreError>;

    /// Atomically move a node from `expected` to `next`, setting `owner`
    /// and `updated_at` in the same write.
    ///
    /// Returns `Ok(false)` when the stored status is not `expected` (or the
    /// record changed concurrently). Rejects writes where `owner` does not
    /// agree with `next.is_owned()`.
    async fn compare_and_set_status(
        &self,
        system_id: &str,
        expected: NodeStatus,
        next: NodeStatus,
        owner: Option<&str>,
    ) -> Result<bool, StoreError>;

    /// Set-based update: every node in `from` whose `updated_at` is at or
    /// before `updated_before` moves to `to`. Returns the affected system_ids.
    ///
    /// `to` must be an unowned status.
    async fn bulk_set_status(
        &self,
        from: NodeStatus,
        updated_before: DateTime<Utc>,
        to: NodeStatus,
    ) -> Result<Vec<String>, StoreError>;

    /// Link a MAC address to a node. Fails with `AlreadyExists` if the
    /// address is linked anywhere in the fleet and `NotFound` if the node
    /// does not exist.
    async fn add_mac(&self, system_id: &str, mac: &MacAddress) -> Result<MacLink, StoreError>;

    /// Remove a MAC link from a node. Fails with `NotFound` if the node has
    /// no such link.
    async fn remove_mac(&self, system_id: &str, mac: &MacAddress) -> Result<(), StoreError>;

    /// MAC links of a node, in creation order
    async fn list_macs(&self, system_id: &str) -> Result<Vec<MacLink>, StoreError>;

    /// Look up the link holding a MAC address
    async fn find_mac(&self, mac: &MacAddress) -> Result<Option<MacLink>, StoreError>;
}

/// Validate the owner/status pairing of a compare-and-set request
pub(crate) fn check_owner(next: NodeStatus, owner: Option<&str>) -> Result<(), StoreError> {
    if next.is_owned() != owner.is_some() {
        return Err(StoreError::InvalidRequest(format!(
            "owner must be set iff status is Allocated or Reserved (status {next}, owner {owner:?})"
        )));
    }
    Ok(())
}
