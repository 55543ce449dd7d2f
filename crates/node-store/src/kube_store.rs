//! Kubernetes-backed NodeStore
//!
//! Nodes are `Machine` custom resources named by system_id; MAC links are
//! `MacLink` custom resources named by the dashed MAC address and labelled
//! with the owning system_id.
//!
//! Lifecycle fields live in the Machine status subresource. Every status
//! write is a merge patch that carries the `resourceVersion` read just
//! before, so the API server rejects it with 409 Conflict if anything else
//! wrote the object in between. That conflict is reported as a lost
//! compare-and-set.

use crate::error::StoreError;
use crate::mac::MacAddress;
use crate::models::{sort_by_creation, MacLink, NodeFilter, NodeRecord, NodeStatus};
use crate::store_trait::{check_owner, NodeStore};
use chrono::{DateTime, Utc};
use crds::{
    mac_link_name, MacLink as MacLinkResource, MacLinkSpec, Machine, MachinePhase, MachineSpec,
    SYSTEM_ID_LABEL,
};
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::Client;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// HTTP status the API server returns for optimistic concurrency failures
/// and name collisions
const CONFLICT: u16 = 409;

/// Node store persisting to Kubernetes custom resources
#[derive(Clone)]
pub struct KubeNodeStore {
    machines: Api<Machine>,
    mac_links: Api<MacLinkResource>,
}

impl std::fmt::Debug for KubeNodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeNodeStore").finish_non_exhaustive()
    }
}

impl KubeNodeStore {
    /// Create a store over the Machine and MacLink resources of `namespace`
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            machines: Api::namespaced(client.clone(), namespace),
            mac_links: Api::namespaced(client, namespace),
        }
    }

    async fn get_machine(&self, system_id: &str) -> Result<Machine, StoreError> {
        self.machines
            .get_opt(system_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Node {system_id}")))
    }

    /// Patch the status subresource guarded by `resource_version`.
    /// Returns `Ok(false)` on a 409 Conflict.
    async fn patch_lifecycle(
        &self,
        system_id: &str,
        resource_version: Option<&str>,
        next: NodeStatus,
        owner: Option<&str>,
    ) -> Result<bool, StoreError> {
        let patch = json!({
            "metadata": { "resourceVersion": resource_version },
            "status": {
                "phase": phase_from_status(next),
                // Explicit null so a merge patch clears the owner
                "owner": owner,
                "updatedAt": Utc::now(),
            }
        });
        match self
            .machines
            .patch_status(system_id, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(e)) if e.code == CONFLICT => {
                debug!("Status patch for {} lost a resourceVersion race", system_id);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a Machine whose initial status write failed
    async fn discard_machine(&self, system_id: &str) {
        match self.machines.delete(system_id, &DeleteParams::default()).await {
            Ok(_) => debug!("Discarded half-created Machine {}", system_id),
            Err(e) => warn!("Failed to discard half-created Machine {}: {}", system_id, e),
        }
    }
}

/// Reduce per-node bulk patch outcomes to the moved system_ids
///
/// A lost race or a failed patch skips that node; it is re-examined on the
/// next sweep while the nodes already moved are still reported.
fn collect_swept(outcomes: Vec<(String, Result<bool, StoreError>)>) -> Vec<String> {
    let mut affected: Vec<String> = outcomes
        .into_iter()
        .filter_map(|(system_id, outcome)| match outcome {
            Ok(true) => Some(system_id),
            Ok(false) => None,
            Err(e) => {
                warn!("Bulk status update skipped node {}: {}", system_id, e);
                None
            }
        })
        .collect();
    affected.sort();
    affected
}

/// Map a CRD phase to the store status
pub fn status_from_phase(phase: MachinePhase) -> NodeStatus {
    match phase {
        MachinePhase::Declared => NodeStatus::Declared,
        MachinePhase::Commissioning => NodeStatus::Commissioning,
        MachinePhase::FailedTests => NodeStatus::FailedTests,
        MachinePhase::Ready => NodeStatus::Ready,
        MachinePhase::Allocated => NodeStatus::Allocated,
        MachinePhase::Reserved => NodeStatus::Reserved,
        MachinePhase::Retired => NodeStatus::Retired,
    }
}

/// Map a store status to the CRD phase
pub fn phase_from_status(status: NodeStatus) -> MachinePhase {
    match status {
        NodeStatus::Declared => MachinePhase::Declared,
        NodeStatus::Commissioning => MachinePhase::Commissioning,
        NodeStatus::FailedTests => MachinePhase::FailedTests,
        NodeStatus::Ready => MachinePhase::Ready,
        NodeStatus::Allocated => MachinePhase::Allocated,
        NodeStatus::Reserved => MachinePhase::Reserved,
        NodeStatus::Retired => MachinePhase::Retired,
    }
}

/// Convert a Machine resource into a NodeRecord
///
/// A Machine without status (created but never patched) reads as Declared.
pub fn record_from_machine(machine: &Machine) -> NodeRecord {
    let spec = &machine.spec;
    let created_at = spec.created_at.unwrap_or_else(Utc::now);
    let (status, owner, updated_at) = match &machine.status {
        Some(s) => (
            status_from_phase(s.phase),
            s.owner.clone(),
            s.updated_at.unwrap_or(created_at),
        ),
        None => (NodeStatus::Declared, None, created_at),
    };
    NodeRecord {
        system_id: spec.system_id.clone(),
        hostname: spec.hostname.clone(),
        status,
        owner,
        netboot: spec.netboot,
        architecture: spec.architecture.clone(),
        power_type: spec.power_type.clone(),
        power_parameters: spec.power_parameters.clone(),
        created_at,
        updated_at,
    }
}

fn spec_from_record(node: &NodeRecord) -> MachineSpec {
    MachineSpec {
        system_id: node.system_id.clone(),
        hostname: node.hostname.clone(),
        architecture: node.architecture.clone(),
        power_type: node.power_type.clone(),
        power_parameters: node.power_parameters.clone(),
        netboot: node.netboot,
        created_at: Some(node.created_at),
    }
}

fn link_from_resource(resource: &MacLinkResource) -> Result<MacLink, StoreError> {
    Ok(MacLink {
        mac_address: MacAddress::parse(&resource.spec.mac_address)?,
        system_id: resource.spec.system_id.clone(),
        sequence: resource.spec.sequence,
    })
}

#[async_trait::async_trait]
impl NodeStore for KubeNodeStore {
    async fn get(&self, system_id: &str) -> Result<Option<NodeRecord>, StoreError> {
        Ok(self
            .machines
            .get_opt(system_id)
            .await?
            .as_ref()
            .map(record_from_machine))
    }

    async fn list(&self, filter: &NodeFilter) -> Result<Vec<NodeRecord>, StoreError> {
        let linked = match &filter.mac_addresses {
            Some(macs) => {
                let mut ids = Vec::with_capacity(macs.len());
                for mac in macs {
                    if let Some(link) = self.find_mac(mac).await? {
                        ids.push(link.system_id);
                    }
                }
                Some(ids)
            }
            None => None,
        };

        let machines = self.machines.list(&ListParams::default()).await?;
        let mut results: Vec<NodeRecord> = machines
            .items
            .iter()
            .map(record_from_machine)
            .filter(|node| filter.matches(node))
            .filter(|node| {
                linked
                    .as_ref()
                    .is_none_or(|ids| ids.contains(&node.system_id))
            })
            .collect();
        sort_by_creation(&mut results);
        Ok(results)
    }

    async fn create(&self, node: NodeRecord) -> Result<NodeRecord, StoreError> {
        check_owner(node.status, node.owner.as_deref())?;
        let machine = Machine::new(&node.system_id, spec_from_record(&node));
        let created = match self.machines.create(&PostParams::default(), &machine).await {
            Ok(m) => m,
            Err(kube::Error::Api(e)) if e.code == CONFLICT => {
                return Err(StoreError::AlreadyExists(format!("Node {}", node.system_id)));
            }
            Err(e) => return Err(e.into()),
        };

        // Status is ignored on create; write it through the subresource
        let applied = self
            .patch_lifecycle(
                &node.system_id,
                created.metadata.resource_version.as_deref(),
                node.status,
                node.owner.as_deref(),
            )
            .await;
        match applied {
            Ok(true) => {}
            Ok(false) => {
                self.discard_machine(&node.system_id).await;
                return Err(StoreError::Conflict(format!(
                    "Node {} changed while being created",
                    node.system_id
                )));
            }
            Err(e) => {
                self.discard_machine(&node.system_id).await;
                return Err(e);
            }
        }
        info!("Created Machine {}", node.system_id);
        Ok(record_from_machine(&self.get_machine(&node.system_id).await?))
    }

    async fn save(&self, node: &NodeRecord) -> Result<NodeRecord, StoreError> {
        let mut machine = self.get_machine(&node.system_id).await?;
        let created_at = machine.spec.created_at;
        machine.spec = spec_from_record(node);
        machine.spec.created_at = created_at;

        // replace() carries the resourceVersion read above and never
        // touches the status subresource
        match self
            .machines
            .replace(&node.system_id, &PostParams::default(), &machine)
            .await
        {
            Ok(updated) => Ok(record_from_machine(&updated)),
            Err(kube::Error::Api(e)) if e.code == CONFLICT => Err(StoreError::Conflict(format!(
                "Node {} changed while being saved",
                node.system_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, system_id: &str) -> Result<(), StoreError> {
        self.get_machine(system_id).await?;
        for link in self.list_macs(system_id).await? {
            let name = mac_link_name(link.mac_address.as_str());
            if let Err(e) = self.mac_links.delete(&name, &DeleteParams::default()).await {
                warn!("Failed to delete MacLink {} of {}: {}", name, system_id, e);
                return Err(e.into());
            }
        }
        self.machines
            .delete(system_id, &DeleteParams::default())
            .await?;
        info!("Deleted Machine {}", system_id);
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
        let machine = self.get_machine(system_id).await?;
        if record_from_machine(&machine).status != expected {
            return Ok(false);
        }
        self.patch_lifecycle(
            system_id,
            machine.metadata.resource_version.as_deref(),
            next,
            owner,
        )
        .await
    }

    async fn bulk_set_status(
        &self,
        from: NodeStatus,
        updated_before: DateTime<Utc>,
        to: NodeStatus,
    ) -> Result<Vec<String>, StoreError> {
        check_owner(to, None)?;
        let machines = self.machines.list(&ListParams::default()).await?;
        let mut outcomes = Vec::new();
        for machine in &machines.items {
            let node = record_from_machine(machine);
            if node.status != from || node.updated_at > updated_before {
                continue;
            }
            let outcome = self
                .patch_lifecycle(
                    &node.system_id,
                    machine.metadata.resource_version.as_deref(),
                    to,
                    None,
                )
                .await;
            outcomes.push((node.system_id, outcome));
        }
        Ok(collect_swept(outcomes))
    }

    async fn add_mac(&self, system_id: &str, mac: &MacAddress) -> Result<MacLink, StoreError> {
        self.get_machine(system_id).await?;
        let spec = MacLinkSpec {
            mac_address: mac.to_string(),
            system_id: system_id.to_string(),
            sequence: Utc::now().timestamp_micros(),
        };
        let mut resource = MacLinkResource::new(&mac_link_name(mac.as_str()), spec);
        resource.metadata.labels = Some(BTreeMap::from([(
            SYSTEM_ID_LABEL.to_string(),
            system_id.to_string(),
        )]));

        match self.mac_links.create(&PostParams::default(), &resource).await {
            Ok(created) => link_from_resource(&created),
            Err(kube::Error::Api(e)) if e.code == CONFLICT => Err(StoreError::AlreadyExists(
                format!("MAC address {mac} is already registered"),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_mac(&self, system_id: &str, mac: &MacAddress) -> Result<(), StoreError> {
        let name = mac_link_name(mac.as_str());
        match self.mac_links.get_opt(&name).await? {
            Some(link) if link.spec.system_id == system_id => {
                self.mac_links.delete(&name, &DeleteParams::default()).await?;
                Ok(())
            }
            _ => Err(StoreError::NotFound(format!(
                "MAC address {mac} on node {system_id}"
            ))),
        }
    }

    async fn list_macs(&self, system_id: &str) -> Result<Vec<MacLink>, StoreError> {
        let params = ListParams::default().labels(&format!("{SYSTEM_ID_LABEL}={system_id}"));
        let resources = self.mac_links.list(&params).await?;
        let mut links = resources
            .items
            .iter()
            .map(link_from_resource)
            .collect::<Result<Vec<_>, _>>()?;
        links.sort_by(|a, b| {
            a.sequence
                .cmp(&b.sequence)
                .then_with(|| a.mac_address.cmp(&b.mac_address))
        });
        Ok(links)
    }

    async fn find_mac(&self, mac: &MacAddress) -> Result<Option<MacLink>, StoreError> {
        self.mac_links
            .get_opt(&mac_link_name(mac.as_str()))
            .await?
            .as_ref()
            .map(link_from_resource)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::MachineStatus;

    fn machine(phase: Option<MachinePhase>, owner: Option<&str>) -> Machine {
        let created = Utc::now() - chrono::Duration::hours(1);
        let mut machine = Machine::new(
            "node-1",
            MachineSpec {
                system_id: "node-1".to_string(),
                hostname: "host-1".to_string(),
                architecture: "amd64".to_string(),
                power_type: "virsh".to_string(),
                power_parameters: BTreeMap::new(),
                netboot: false,
                created_at: Some(created),
            },
        );
        machine.status = phase.map(|phase| MachineStatus {
            phase,
            owner: owner.map(str::to_string),
            updated_at: None,
        });
        machine
    }

    #[test]
    fn test_machine_without_status_reads_as_declared() {
        let node = record_from_machine(&machine(None, None));
        assert_eq!(node.status, NodeStatus::Declared);
        assert_eq!(node.owner, None);
        assert_eq!(node.updated_at, node.created_at);
        assert_eq!(node.architecture, "amd64");
        assert!(!node.netboot);
    }

    #[test]
    fn test_machine_status_maps_owner_and_phase() {
        let node = record_from_machine(&machine(Some(MachinePhase::Allocated), Some("alice")));
        assert_eq!(node.status, NodeStatus::Allocated);
        assert_eq!(node.owner.as_deref(), Some("alice"));
    }

    #[test]
    fn test_phase_mapping_round_trips_every_status() {
        for status in NodeStatus::ALL {
            assert_eq!(status_from_phase(phase_from_status(status)), status);
        }
    }

    #[test]
    fn test_collect_swept_keeps_moved_nodes_past_a_failure() {
        let outcomes = vec![
            ("node-c".to_string(), Ok(true)),
            (
                "node-b".to_string(),
                Err(StoreError::Conflict("apiserver unavailable".into())),
            ),
            ("node-d".to_string(), Ok(false)),
            ("node-a".to_string(), Ok(true)),
        ];
        assert_eq!(
            collect_swept(outcomes),
            vec!["node-a".to_string(), "node-c".to_string()]
        );
    }

    #[tokio::test]
    #[ignore] // Requires a Kubernetes cluster with the FleetOps CRDs installed
    async fn test_kube_store_compare_and_set() {
        let client = Client::try_default().await.expect("kube client");
        let store = KubeNodeStore::new(client, "default");
        let system_id = NodeRecord::generate_system_id();
        let mut node = NodeRecord::new(system_id.clone(), "kube-test");
        node.status = NodeStatus::Ready;
        store.create(node).await.expect("create");

        let won = store
            .compare_and_set_status(
                &system_id,
                NodeStatus::Ready,
                NodeStatus::Allocated,
                Some("alice"),
            )
            .await
            .expect("cas");
        assert!(won);
        let lost = store
            .compare_and_set_status(
                &system_id,
                NodeStatus::Ready,
                NodeStatus::Allocated,
                Some("bob"),
            )
            .await
            .expect("cas");
        assert!(!lost);

        store.delete(&system_id).await.expect("delete");
    }
}
