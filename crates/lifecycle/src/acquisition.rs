//! Acquisition, acceptance and power requests for batches of nodes.

use crate::actor::Actor;
use crate::authz::Capability;
use crate::error::{LifecycleError, Result};
use crate::transition::TransitionEngine;
use node_store::{NodeFilter, NodeRecord, NodeStatus};
use power_client::{PowerControl, PowerError, PowerRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Constraints an acquired node must satisfy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationConstraint {
    /// Exact hostname
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AllocationConstraint {
    /// No constraint: any Ready node will do
    pub fn any() -> Self {
        Self::default()
    }

    /// Only the node with this hostname
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    pub fn matches(&self, node: &NodeRecord) -> bool {
        self.name.as_deref().is_none_or(|name| node.hostname == name)
    }
}

fn power_request(node: &NodeRecord) -> PowerRequest {
    PowerRequest {
        system_id: node.system_id.clone(),
        power_type: node.power_type.clone(),
        power_parameters: node.power_parameters.clone(),
    }
}

/// Coordinates operations that pick or address several nodes at once
#[derive(Clone)]
pub struct AcquisitionCoordinator {
    engine: TransitionEngine,
    power: Arc<dyn PowerControl>,
}

impl AcquisitionCoordinator {
    pub fn new(engine: TransitionEngine, power: Arc<dyn PowerControl>) -> Self {
        Self { engine, power }
    }

    /// Allocate one Ready node matching `constraints` to `requester`
    ///
    /// Candidates are the Ready nodes the requester can see, tried in
    /// ascending system_id order. Each try is a compare-and-set from Ready,
    /// so two concurrent acquisitions can never both win the same node; the
    /// loser moves on to the next candidate and re-reads the candidate set
    /// once it runs out, up to `acquire_attempts` times.
    pub async fn acquire(
        &self,
        requester: &Actor,
        constraints: &AllocationConstraint,
    ) -> Result<NodeRecord> {
        if requester.is_anonymous() {
            return Err(LifecycleError::PermissionDenied(
                "You must be logged in to acquire nodes.".to_string(),
            ));
        }

        let attempts = self.engine.config().acquire_attempts.max(1);
        for attempt in 1..=attempts {
            let mut filter = NodeFilter::all().with_status(NodeStatus::Ready);
            if let Some(name) = &constraints.name {
                filter = filter.with_hostname(name.clone());
            }
            let mut candidates: Vec<NodeRecord> = self
                .engine
                .store()
                .list(&filter)
                .await?
                .into_iter()
                .filter(|node| {
                    constraints.matches(node) && self.engine.authz().can_view(requester, node)
                })
                .collect();
            if candidates.is_empty() {
                break;
            }
            candidates.sort_by(|a, b| a.system_id.cmp(&b.system_id));

            for candidate in &candidates {
                if let Some(node) = self
                    .engine
                    .try_transition(candidate, NodeStatus::Allocated, requester)
                    .await?
                {
                    info!(
                        "Acquired node {} for {}",
                        node.system_id,
                        requester.name().unwrap_or_default()
                    );
                    return Ok(node);
                }
                debug!(
                    "Node {} taken concurrently (attempt {}/{})",
                    candidate.system_id, attempt, attempts
                );
            }
        }

        Err(LifecycleError::NodesNotAvailable(
            "No matching node is available.".to_string(),
        ))
    }

    /// Accept the enlistment of Declared nodes
    ///
    /// All checks run before any node is changed: unknown identifiers fail
    /// with `BadRequest`, missing admin rights with `PermissionDenied` and a
    /// node outside Declared/Ready with `NodeStateViolation`. Returns the
    /// system_ids whose status actually changed; already accepted nodes are
    /// left out.
    pub async fn accept(&self, system_ids: &[String], actor: &Actor) -> Result<Vec<String>> {
        let requested: BTreeSet<&str> = system_ids.iter().map(String::as_str).collect();
        if requested.is_empty() {
            return Ok(Vec::new());
        }

        let mut nodes = self
            .engine
            .store()
            .list(&NodeFilter::all().with_ids(requested.iter().copied()))
            .await?;
        nodes.sort_by(|a, b| a.system_id.cmp(&b.system_id));

        let found: BTreeSet<&str> = nodes.iter().map(|n| n.system_id.as_str()).collect();
        let unknown: Vec<&str> = requested.difference(&found).copied().collect();
        if !unknown.is_empty() {
            return Err(LifecycleError::BadRequest(format!(
                "Unknown node(s): {}.",
                unknown.join(", ")
            )));
        }

        let denied: Vec<&str> = nodes
            .iter()
            .filter(|n| !self.engine.authz().can_admin(actor, n))
            .map(|n| n.system_id.as_str())
            .collect();
        if !denied.is_empty() {
            return Err(LifecycleError::PermissionDenied(format!(
                "You don't have the required permission to accept the following node(s): {}.",
                denied.join(", ")
            )));
        }

        if let Some(node) = nodes
            .iter()
            .find(|n| !matches!(n.status, NodeStatus::Declared | NodeStatus::Ready))
        {
            return Err(LifecycleError::NodeStateViolation(format!(
                "Cannot accept node enlistment: node {} is in state {}.",
                node.system_id,
                node.display_status()
            )));
        }

        let mut changed = Vec::new();
        for node in nodes.iter().filter(|n| n.status == NodeStatus::Declared) {
            match self
                .engine
                .try_transition(node, NodeStatus::Ready, actor)
                .await?
            {
                Some(accepted) => changed.push(accepted.system_id),
                None => {
                    let current = self.engine.load(&node.system_id).await?;
                    if current.status != NodeStatus::Ready {
                        return Err(LifecycleError::NodeStateViolation(format!(
                            "Cannot accept node enlistment: node {} is in state {}.",
                            current.system_id,
                            current.display_status()
                        )));
                    }
                    debug!("Node {} was accepted concurrently", node.system_id);
                }
            }
        }
        info!("Accepted {} node(s)", changed.len());
        Ok(changed)
    }

    /// Request power-on for the nodes the actor may edit
    ///
    /// Nodes the actor cannot edit are skipped; the call fails with
    /// `PermissionDenied` only when none is left. `user_data` is passed
    /// through to the power agent as raw bytes.
    ///
    /// Every node is tried even if the agent refuses one of them. Requests
    /// already accepted are not undone, so a partial failure names both the
    /// refused nodes and the ones that were requested.
    pub async fn start(
        &self,
        system_ids: &[String],
        actor: &Actor,
        user_data: Option<&[u8]>,
    ) -> Result<Vec<NodeRecord>> {
        let nodes = self.editable(system_ids, actor).await?;
        if nodes.is_empty() {
            return Err(LifecycleError::PermissionDenied(
                "You are not allowed to start up the requested node(s).".to_string(),
            ));
        }
        let mut refused = Vec::new();
        for node in &nodes {
            match self.power.request_start(&power_request(node), user_data).await {
                Ok(()) => info!("Requested power-on of node {}", node.system_id),
                Err(e) => {
                    warn!("Power-on of node {} failed: {}", node.system_id, e);
                    refused.push((node.system_id.clone(), e));
                }
            }
        }
        batch_outcome("Power-on", nodes, refused)
    }

    /// Request power-off for the nodes the actor may edit
    ///
    /// Partial failures are reported the same way as for [`Self::start`].
    pub async fn stop(&self, system_ids: &[String], actor: &Actor) -> Result<Vec<NodeRecord>> {
        let nodes = self.editable(system_ids, actor).await?;
        if nodes.is_empty() {
            return Err(LifecycleError::PermissionDenied(
                "You are not allowed to shut down the requested node(s).".to_string(),
            ));
        }
        let mut refused = Vec::new();
        for node in &nodes {
            match self.power.request_stop(&power_request(node)).await {
                Ok(()) => info!("Requested power-off of node {}", node.system_id),
                Err(e) => {
                    warn!("Power-off of node {} failed: {}", node.system_id, e);
                    refused.push((node.system_id.clone(), e));
                }
            }
        }
        batch_outcome("Power-off", nodes, refused)
    }

    async fn editable(&self, system_ids: &[String], actor: &Actor) -> Result<Vec<NodeRecord>> {
        if system_ids.is_empty() {
            return Ok(Vec::new());
        }
        let nodes = self
            .engine
            .store()
            .list(&NodeFilter::all().with_ids(system_ids.iter().cloned()))
            .await?;
        Ok(nodes
            .into_iter()
            .filter(|n| self.engine.authz().allows(Capability::Edit, actor, n))
            .collect())
    }
}

/// Fold the per-node power results of a batch into one outcome
fn batch_outcome(
    action: &str,
    nodes: Vec<NodeRecord>,
    refused: Vec<(String, PowerError)>,
) -> Result<Vec<NodeRecord>> {
    if refused.is_empty() {
        return Ok(nodes);
    }
    let requested: Vec<&str> = nodes
        .iter()
        .map(|n| n.system_id.as_str())
        .filter(|id| refused.iter().all(|(r, _)| r != id))
        .collect();
    let failures: Vec<String> = refused
        .iter()
        .map(|(id, e)| format!("{id} ({e})"))
        .collect();
    let requested = if requested.is_empty() {
        "none".to_string()
    } else {
        requested.join(", ")
    };
    Err(LifecycleError::Power(PowerError::Api(format!(
        "{action} failed for node(s) {}; already requested for node(s): {requested}.",
        failures.join(", ")
    ))))
}
