//! Reading, updating, listing and deleting nodes.

use crate::actor::Actor;
use crate::authz::Capability;
use crate::error::{LifecycleError, Result};
use crate::transition::TransitionEngine;
use crate::validation::{parse_mac, validate_architecture, validate_hostname, validate_power_type};
use node_store::{NodeFilter, NodeRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Descriptive attributes to change; `None` leaves a field as is
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeUpdate {
    pub hostname: Option<String>,
    pub architecture: Option<String>,
    pub netboot: Option<bool>,
    /// Needs admin rights
    pub power_type: Option<String>,
    /// Needs admin rights
    pub power_parameters: Option<BTreeMap<String, String>>,
}

impl NodeUpdate {
    fn touches_power(&self) -> bool {
        self.power_type.is_some() || self.power_parameters.is_some()
    }
}

/// Optional narrowing for node listings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeQuery {
    pub ids: Option<Vec<String>>,
    pub mac_addresses: Option<Vec<String>>,
}

impl NodeQuery {
    fn to_filter(&self) -> Result<NodeFilter> {
        let mut filter = NodeFilter::all();
        if let Some(ids) = &self.ids {
            filter = filter.with_ids(ids.iter().cloned());
        }
        if let Some(macs) = &self.mac_addresses {
            let macs = macs
                .iter()
                .map(|m| parse_mac(m))
                .collect::<Result<Vec<_>>>()?;
            filter = filter.with_mac_addresses(macs);
        }
        Ok(filter)
    }
}

#[derive(Clone)]
pub struct NodeManager {
    engine: TransitionEngine,
}

impl NodeManager {
    pub fn new(engine: TransitionEngine) -> Self {
        Self { engine }
    }

    pub async fn get(&self, system_id: &str, actor: &Actor) -> Result<NodeRecord> {
        self.engine
            .load_authorized(system_id, actor, Capability::View)
            .await
    }

    /// Change descriptive attributes of a node the actor may edit
    ///
    /// Status and owner are never touched here.
    pub async fn update(
        &self,
        system_id: &str,
        update: NodeUpdate,
        actor: &Actor,
    ) -> Result<NodeRecord> {
        let capability = if update.touches_power() {
            Capability::Admin
        } else {
            Capability::Edit
        };
        let mut node = self
            .engine
            .load_authorized(system_id, actor, capability)
            .await?;

        if let Some(hostname) = update.hostname {
            validate_hostname(&hostname)?;
            node.hostname = hostname;
        }
        if let Some(architecture) = update.architecture {
            validate_architecture(&architecture)?;
            node.architecture = architecture;
        }
        if let Some(power_type) = update.power_type {
            validate_power_type(&power_type)?;
            node.power_type = power_type;
        }
        if let Some(power_parameters) = update.power_parameters {
            node.power_parameters = power_parameters;
        }
        if let Some(netboot) = update.netboot {
            node.netboot = netboot;
        }

        let saved = self.engine.store().save(&node).await?;
        info!("Updated node {}", saved.system_id);
        Ok(saved)
    }

    /// Delete a node and its MAC links (admin only)
    pub async fn delete(&self, system_id: &str, actor: &Actor) -> Result<()> {
        let node = self
            .engine
            .load_authorized(system_id, actor, Capability::Admin)
            .await?;
        self.engine.store().delete(&node.system_id).await?;
        info!("Deleted node {}", node.system_id);
        Ok(())
    }

    /// Nodes visible to the actor, in creation order
    pub async fn list(&self, actor: &Actor, query: &NodeQuery) -> Result<Vec<NodeRecord>> {
        let filter = query.to_filter()?;
        let authz = self.engine.authz();
        Ok(self
            .engine
            .store()
            .list(&filter)
            .await?
            .into_iter()
            .filter(|node| authz.can_view(actor, node))
            .collect())
    }

    /// Nodes the actor currently owns (Allocated or Reserved), in creation
    /// order
    pub async fn list_allocated(
        &self,
        actor: &Actor,
        query: &NodeQuery,
    ) -> Result<Vec<NodeRecord>> {
        let owner = actor.name().ok_or_else(|| {
            LifecycleError::PermissionDenied(
                "You must be logged in to list allocated nodes.".to_string(),
            )
        })?;
        let filter = query.to_filter()?.with_owner(owner);
        Ok(self.engine.store().list(&filter).await?)
    }
}
