//! Node status transitions.
//!
//! The edge table below is the only authority on which status changes are
//! legal. Every status write in the lifecycle core goes through
//! [`TransitionEngine`], which validates the edge, checks the actor's
//! capability and then commits with a compare-and-set on the expected
//! source status. The owner field is written in the same compare-and-set:
//! entering Allocated or Reserved sets it to the actor, every other target
//! clears it.

use crate::actor::Actor;
use crate::authz::{Authorization, Capability};
use crate::config::LifecycleConfig;
use crate::error::{LifecycleError, Result};
use chrono::{DateTime, Utc};
use node_store::{NodeRecord, NodeStatus, NodeStore, StoreError};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Legal targets for each source status
pub fn allowed_targets(from: NodeStatus) -> &'static [NodeStatus] {
    use NodeStatus::*;
    match from {
        Declared => &[Commissioning, Ready, Retired],
        Commissioning => &[FailedTests, Ready],
        FailedTests => &[Commissioning, Retired],
        Ready => &[Allocated, Reserved, Retired],
        Allocated => &[Ready, Retired],
        Reserved => &[Ready, Retired],
        Retired => &[],
    }
}

/// Whether `from -> to` is an edge of the transition table
pub fn is_allowed(from: NodeStatus, to: NodeStatus) -> bool {
    allowed_targets(from).contains(&to)
}

/// Capability an actor needs to take the edge `from -> to`
///
/// Acquiring a Ready node only needs visibility, giving an owned node back
/// needs edit rights on it, everything else is an admin operation.
pub fn required_capability(from: NodeStatus, to: NodeStatus) -> Capability {
    use NodeStatus::*;
    match (from, to) {
        (Ready, Allocated) => Capability::View,
        (Allocated | Reserved, Ready) => Capability::Edit,
        _ => Capability::Admin,
    }
}

/// Validates and commits status transitions
#[derive(Clone)]
pub struct TransitionEngine {
    store: Arc<dyn NodeStore>,
    authz: Arc<dyn Authorization>,
    config: LifecycleConfig,
}

impl TransitionEngine {
    pub fn new(
        store: Arc<dyn NodeStore>,
        authz: Arc<dyn Authorization>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            store,
            authz,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn NodeStore> {
        &self.store
    }

    pub fn authz(&self) -> &Arc<dyn Authorization> {
        &self.authz
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Fetch a node or fail with `NotFound`
    pub async fn load(&self, system_id: &str) -> Result<NodeRecord> {
        self.store
            .get(system_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(format!("Node {system_id} not found")))
    }

    /// Fetch a node and check that `actor` holds `capability` on it
    pub async fn load_authorized(
        &self,
        system_id: &str,
        actor: &Actor,
        capability: Capability,
    ) -> Result<NodeRecord> {
        let node = self.load(system_id).await?;
        self.authorize(capability, actor, &node)?;
        Ok(node)
    }

    pub(crate) fn authorize(
        &self,
        capability: Capability,
        actor: &Actor,
        node: &NodeRecord,
    ) -> Result<()> {
        if self.authz.allows(capability, actor, node) {
            Ok(())
        } else {
            Err(LifecycleError::PermissionDenied(format!(
                "You don't have the required permission on node {}.",
                node.system_id
            )))
        }
    }

    /// Move a node to `target` on behalf of `actor`
    ///
    /// Fails with `InvalidTransition` if the edge from the node's current
    /// status is not in the table and with `PermissionDenied` if the actor
    /// lacks the capability the edge needs. A compare-and-set lost to a
    /// concurrent writer is retried against the fresh status; once the
    /// attempts run out the call fails with `NodeStateViolation`.
    pub async fn transition(
        &self,
        system_id: &str,
        target: NodeStatus,
        actor: &Actor,
    ) -> Result<NodeRecord> {
        let mut current = self.load(system_id).await?;
        for _ in 0..self.config.transition_attempts.max(1) {
            if let Some(node) = self.try_transition(&current, target, actor).await? {
                return Ok(node);
            }
            debug!(
                "Lost status race on node {}, reloading before retry",
                system_id
            );
            current = self.load(system_id).await?;
        }
        warn!(
            "Giving up on transition of node {} to {} after {} attempts",
            system_id, target, self.config.transition_attempts
        );
        Err(LifecycleError::NodeStateViolation(format!(
            "Node {system_id} changed state concurrently while moving to {}.",
            target.display_name()
        )))
    }

    /// Single compare-and-set attempt from the status `node` was read with
    ///
    /// Returns `Ok(None)` when the stored status no longer matches (or the
    /// node disappeared) so the caller can decide whether to retry.
    pub(crate) async fn try_transition(
        &self,
        node: &NodeRecord,
        target: NodeStatus,
        actor: &Actor,
    ) -> Result<Option<NodeRecord>> {
        if !is_allowed(node.status, target) {
            return Err(LifecycleError::InvalidTransition {
                system_id: node.system_id.clone(),
                from: node.status,
                to: target,
            });
        }
        self.authorize(required_capability(node.status, target), actor, node)?;

        let owner = if target.is_owned() {
            Some(actor.name().ok_or_else(|| {
                LifecycleError::PermissionDenied(format!(
                    "An anonymous caller cannot take ownership of node {}.",
                    node.system_id
                ))
            })?)
        } else {
            None
        };

        match self
            .store
            .compare_and_set_status(&node.system_id, node.status, target, owner)
            .await
        {
            Ok(true) => {}
            Ok(false) | Err(StoreError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        info!(
            "Node {} moved {} -> {}{}",
            node.system_id,
            node.status,
            target,
            owner.map(|o| format!(" (owner {o})")).unwrap_or_default()
        );
        Ok(self.store.get(&node.system_id).await?)
    }

    /// Give an Allocated or Reserved node back to the pool
    ///
    /// Releasing a node that is already Ready succeeds without a write, so
    /// retries are harmless. Any other status is a state violation.
    pub async fn release(&self, system_id: &str, actor: &Actor) -> Result<NodeRecord> {
        for _ in 0..self.config.transition_attempts.max(1) {
            let node = self.load(system_id).await?;
            match node.status {
                NodeStatus::Ready => {
                    self.authorize(Capability::View, actor, &node)?;
                    debug!("Node {} already released", system_id);
                    return Ok(node);
                }
                NodeStatus::Allocated | NodeStatus::Reserved => {
                    if let Some(released) =
                        self.try_transition(&node, NodeStatus::Ready, actor).await?
                    {
                        return Ok(released);
                    }
                }
                _ => {
                    return Err(LifecycleError::NodeStateViolation(format!(
                        "Node cannot be released in its current state ('{}').",
                        node.display_status()
                    )));
                }
            }
        }
        Err(LifecycleError::NodeStateViolation(format!(
            "Node {system_id} changed state concurrently while being released."
        )))
    }

    /// Fail every Commissioning node whose last change is older than the
    /// commissioning timeout
    ///
    /// Runs as one set-based store update, so a node that leaves
    /// Commissioning concurrently is not touched. Returns the affected
    /// system_ids.
    pub async fn bulk_status_sweep(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let cutoff = now - self.config.commissioning_timeout;
        let failed = self
            .store
            .bulk_set_status(NodeStatus::Commissioning, cutoff, NodeStatus::FailedTests)
            .await?;
        if failed.is_empty() {
            debug!("No commissioning node older than {}", cutoff);
        } else {
            warn!(
                "Commissioning timed out for {} node(s): {}",
                failed.len(),
                failed.join(", ")
            );
        }
        Ok(failed)
    }
}

