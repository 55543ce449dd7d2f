//! Enlistment of new nodes.

use crate::actor::Actor;
use crate::error::{LifecycleError, Result};
use crate::transition::TransitionEngine;
use crate::validation::{
    DEFAULT_ARCHITECTURE, parse_mac_list, validate_architecture, validate_hostname,
    validate_power_type,
};
use node_store::{MacAddress, NodeRecord, NodeStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

fn default_architecture() -> String {
    DEFAULT_ARCHITECTURE.to_string()
}

fn default_netboot() -> bool {
    true
}

/// Attributes a machine enlists with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnlistRequest {
    /// Defaults to the generated system_id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default = "default_architecture")]
    pub architecture: String,
    #[serde(default)]
    pub power_type: String,
    #[serde(default)]
    pub power_parameters: BTreeMap<String, String>,
    #[serde(default = "default_netboot")]
    pub netboot: bool,
    pub mac_addresses: Vec<String>,
}

impl EnlistRequest {
    pub fn new<I, S>(mac_addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hostname: None,
            architecture: default_architecture(),
            power_type: String::new(),
            power_parameters: BTreeMap::new(),
            netboot: true,
            mac_addresses: mac_addresses.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    #[must_use]
    pub fn with_architecture(mut self, architecture: impl Into<String>) -> Self {
        self.architecture = architecture.into();
        self
    }

    #[must_use]
    pub fn with_power(
        mut self,
        power_type: impl Into<String>,
        power_parameters: BTreeMap<String, String>,
    ) -> Self {
        self.power_type = power_type.into();
        self.power_parameters = power_parameters;
        self
    }

    /// Check every field and return the normalised MAC addresses
    fn validate(&self) -> Result<Vec<MacAddress>> {
        if let Some(hostname) = &self.hostname {
            validate_hostname(hostname)?;
        }
        validate_architecture(&self.architecture)?;
        validate_power_type(&self.power_type)?;
        parse_mac_list(&self.mac_addresses)
    }
}

/// Creates nodes and answers registration queries
#[derive(Clone)]
pub struct EnlistmentWorkflow {
    engine: TransitionEngine,
}

impl EnlistmentWorkflow {
    pub fn new(engine: TransitionEngine) -> Self {
        Self { engine }
    }

    /// Create a Declared node with its MAC links
    ///
    /// Validation (including MAC uniqueness across the fleet) happens before
    /// anything is written. When the actor holds admin rights the node is
    /// accepted straight away and comes back Ready.
    pub async fn enlist(&self, request: EnlistRequest, actor: &Actor) -> Result<NodeRecord> {
        let macs = request.validate()?;
        let store = self.engine.store();
        for mac in &macs {
            if store.find_mac(mac).await?.is_some() {
                return Err(LifecycleError::ValidationError(format!(
                    "Mac address {mac} already in use."
                )));
            }
        }

        let system_id = NodeRecord::generate_system_id();
        let hostname = request.hostname.unwrap_or_else(|| system_id.clone());
        let mut node = NodeRecord::new(system_id, hostname);
        node.architecture = request.architecture;
        node.power_type = request.power_type;
        node.power_parameters = request.power_parameters;
        node.netboot = request.netboot;

        let node = store.create(node).await?;
        for mac in &macs {
            if let Err(e) = store.add_mac(&node.system_id, mac).await {
                warn!(
                    "Linking {} to node {} failed, rolling back enlistment: {}",
                    mac, node.system_id, e
                );
                if let Err(cleanup) = store.delete(&node.system_id).await {
                    warn!("Rollback of node {} failed: {}", node.system_id, cleanup);
                }
                return Err(e.into());
            }
        }
        info!(
            "Enlisted node {} ({}) with {} MAC address(es)",
            node.system_id,
            node.hostname,
            macs.len()
        );

        if self.engine.authz().can_admin(actor, &node) {
            debug!("Auto-accepting node {} enlisted by an admin", node.system_id);
            return self
                .engine
                .transition(&node.system_id, NodeStatus::Ready, actor)
                .await;
        }
        Ok(node)
    }

    /// Whether `mac_address` is linked to a node that is not Retired
    ///
    /// A malformed address cannot be linked anywhere, so it is simply not
    /// registered.
    pub async fn is_registered(&self, mac_address: &str) -> Result<bool> {
        let Ok(mac) = MacAddress::parse(mac_address) else {
            return Ok(false);
        };
        let store = self.engine.store();
        let Some(link) = store.find_mac(&mac).await? else {
            return Ok(false);
        };
        Ok(store
            .get(&link.system_id)
            .await?
            .is_some_and(|node| node.status != NodeStatus::Retired))
    }
}
