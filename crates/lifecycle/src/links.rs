//! MAC links of a node.

use crate::actor::Actor;
use crate::authz::Capability;
use crate::error::{LifecycleError, Result};
use crate::transition::TransitionEngine;
use crate::validation::parse_mac;
use node_store::{MacLink, StoreError};
use tracing::info;

/// Manages the MAC addresses attached to nodes
#[derive(Clone)]
pub struct LinkManager {
    engine: TransitionEngine,
}

impl LinkManager {
    pub fn new(engine: TransitionEngine) -> Self {
        Self { engine }
    }

    /// Link a MAC address to a node the actor may edit
    pub async fn add_mac(
        &self,
        system_id: &str,
        mac_address: &str,
        actor: &Actor,
    ) -> Result<MacLink> {
        let node = self
            .engine
            .load_authorized(system_id, actor, Capability::Edit)
            .await?;
        let mac = parse_mac(mac_address)?;
        let link = self
            .engine
            .store()
            .add_mac(&node.system_id, &mac)
            .await
            .map_err(|e| match e {
                StoreError::AlreadyExists(_) => {
                    LifecycleError::ValidationError(format!("Mac address {mac} already in use."))
                }
                other => other.into(),
            })?;
        info!("Linked {} to node {}", mac, node.system_id);
        Ok(link)
    }

    /// Remove a MAC link from a node the actor may edit
    pub async fn remove_mac(
        &self,
        system_id: &str,
        mac_address: &str,
        actor: &Actor,
    ) -> Result<()> {
        let mac = parse_mac(mac_address)?;
        let node = self
            .engine
            .load_authorized(system_id, actor, Capability::Edit)
            .await?;
        self.engine
            .store()
            .remove_mac(&node.system_id, &mac)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => LifecycleError::NotFound(format!(
                    "MAC address {mac} is not linked to node {system_id}"
                )),
                other => other.into(),
            })?;
        info!("Unlinked {} from node {}", mac, node.system_id);
        Ok(())
    }

    /// MAC links of a visible node, in creation order
    pub async fn list_macs(&self, system_id: &str, actor: &Actor) -> Result<Vec<MacLink>> {
        let node = self
            .engine
            .load_authorized(system_id, actor, Capability::View)
            .await?;
        Ok(self.engine.store().list_macs(&node.system_id).await?)
    }

    /// One MAC link of a visible node
    pub async fn get_mac(
        &self,
        system_id: &str,
        mac_address: &str,
        actor: &Actor,
    ) -> Result<MacLink> {
        let node = self
            .engine
            .load_authorized(system_id, actor, Capability::View)
            .await?;
        let mac = parse_mac(mac_address)?;
        self.engine
            .store()
            .find_mac(&mac)
            .await?
            .filter(|link| link.system_id == node.system_id)
            .ok_or_else(|| {
                LifecycleError::NotFound(format!(
                    "MAC address {mac} is not linked to node {system_id}"
                ))
            })
    }
}
