//! Command dispatch.
//!
//! [`Command`] is the typed request an API boundary builds from a call; it
//! deserializes from `{"op": "acquire", ...}`. [`LifecycleService::execute`]
//! runs it and returns an [`Outcome`]. Transport concerns end here: start's
//! `user_data` arrives base64 encoded and is decoded before it reaches the
//! core.

use crate::acquisition::AllocationConstraint;
use crate::actor::Actor;
use crate::boot::{BootPurpose, boot_purpose};
use crate::enlistment::EnlistRequest;
use crate::error::{LifecycleError, Result};
use crate::nodes::{NodeQuery, NodeUpdate};
use crate::service::LifecycleService;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use node_store::{MacLink, NodeRecord, NodeStatus};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A lifecycle operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    Enlist(EnlistRequest),
    Accept {
        system_ids: Vec<String>,
    },
    Acquire(AllocationConstraint),
    Start {
        system_ids: Vec<String>,
        /// Base64 encoded
        #[serde(default)]
        user_data: Option<String>,
    },
    Stop {
        system_ids: Vec<String>,
    },
    Release {
        system_id: String,
    },
    Transition {
        system_id: String,
        target: NodeStatus,
    },
    IsRegistered {
        mac_address: String,
    },
    Read {
        system_id: String,
    },
    Update {
        system_id: String,
        update: NodeUpdate,
    },
    Delete {
        system_id: String,
    },
    List(NodeQuery),
    ListAllocated(NodeQuery),
    AddMac {
        system_id: String,
        mac_address: String,
    },
    RemoveMac {
        system_id: String,
        mac_address: String,
    },
    ListMacs {
        system_id: String,
    },
    GetMac {
        system_id: String,
        mac_address: String,
    },
    BootPurpose {
        mac_address: String,
    },
    CheckCommissioning,
}

impl Command {
    /// Operation name, for logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            Command::Enlist(_) => "enlist",
            Command::Accept { .. } => "accept",
            Command::Acquire(_) => "acquire",
            Command::Start { .. } => "start",
            Command::Stop { .. } => "stop",
            Command::Release { .. } => "release",
            Command::Transition { .. } => "transition",
            Command::IsRegistered { .. } => "is_registered",
            Command::Read { .. } => "read",
            Command::Update { .. } => "update",
            Command::Delete { .. } => "delete",
            Command::List(_) => "list",
            Command::ListAllocated(_) => "list_allocated",
            Command::AddMac { .. } => "add_mac",
            Command::RemoveMac { .. } => "remove_mac",
            Command::ListMacs { .. } => "list_macs",
            Command::GetMac { .. } => "get_mac",
            Command::BootPurpose { .. } => "boot_purpose",
            Command::CheckCommissioning => "check_commissioning",
        }
    }
}

/// Result of a [`Command`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Node(NodeRecord),
    Nodes(Vec<NodeRecord>),
    SystemIds(Vec<String>),
    MacLink(MacLink),
    MacLinks(Vec<MacLink>),
    Registered(bool),
    BootPurpose(BootPurpose),
    Done,
}

/// Decode base64 user data supplied with a start request
pub fn decode_user_data(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| LifecycleError::ValidationError(format!("user_data is not valid base64: {e}")))
}

impl LifecycleService {
    /// Run a command on behalf of `actor`
    pub async fn execute(&self, command: Command, actor: &Actor) -> Result<Outcome> {
        debug!("Executing {} for {:?}", command.name(), actor.name());
        let outcome = match command {
            Command::Enlist(request) => {
                Outcome::Node(self.enlistment().enlist(request, actor).await?)
            }
            Command::Accept { system_ids } => {
                Outcome::SystemIds(self.acquisition().accept(&system_ids, actor).await?)
            }
            Command::Acquire(constraints) => {
                Outcome::Node(self.acquisition().acquire(actor, &constraints).await?)
            }
            Command::Start {
                system_ids,
                user_data,
            } => {
                let user_data = user_data.as_deref().map(decode_user_data).transpose()?;
                Outcome::Nodes(
                    self.acquisition()
                        .start(&system_ids, actor, user_data.as_deref())
                        .await?,
                )
            }
            Command::Stop { system_ids } => {
                Outcome::Nodes(self.acquisition().stop(&system_ids, actor).await?)
            }
            Command::Release { system_id } => {
                Outcome::Node(self.transitions().release(&system_id, actor).await?)
            }
            Command::Transition { system_id, target } => {
                Outcome::Node(self.transitions().transition(&system_id, target, actor).await?)
            }
            Command::IsRegistered { mac_address } => {
                Outcome::Registered(self.enlistment().is_registered(&mac_address).await?)
            }
            Command::Read { system_id } => {
                Outcome::Node(self.nodes().get(&system_id, actor).await?)
            }
            Command::Update { system_id, update } => {
                Outcome::Node(self.nodes().update(&system_id, update, actor).await?)
            }
            Command::Delete { system_id } => {
                self.nodes().delete(&system_id, actor).await?;
                Outcome::Done
            }
            Command::List(query) => Outcome::Nodes(self.nodes().list(actor, &query).await?),
            Command::ListAllocated(query) => {
                Outcome::Nodes(self.nodes().list_allocated(actor, &query).await?)
            }
            Command::AddMac {
                system_id,
                mac_address,
            } => Outcome::MacLink(self.links().add_mac(&system_id, &mac_address, actor).await?),
            Command::RemoveMac {
                system_id,
                mac_address,
            } => {
                self.links()
                    .remove_mac(&system_id, &mac_address, actor)
                    .await?;
                Outcome::Done
            }
            Command::ListMacs { system_id } => {
                Outcome::MacLinks(self.links().list_macs(&system_id, actor).await?)
            }
            Command::GetMac {
                system_id,
                mac_address,
            } => Outcome::MacLink(self.links().get_mac(&system_id, &mac_address, actor).await?),
            Command::BootPurpose { mac_address } => {
                Outcome::BootPurpose(self.boot_purpose_for_mac(&mac_address).await?)
            }
            Command::CheckCommissioning => {
                Outcome::SystemIds(self.transitions().bulk_status_sweep(Utc::now()).await?)
            }
        };
        Ok(outcome)
    }

    /// Boot purpose for the machine that booted with `mac_address`
    ///
    /// An address no node holds belongs to a machine that is enlisting.
    pub async fn boot_purpose_for_mac(&self, mac_address: &str) -> Result<BootPurpose> {
        let mac = crate::validation::parse_mac(mac_address)?;
        let store = self.transitions().store();
        let node = match store.find_mac(&mac).await? {
            Some(link) => store.get(&link.system_id).await?,
            None => None,
        };
        Ok(boot_purpose(node.as_ref()))
    }
}
