//! Authorization collaborator.
//!
//! The lifecycle core asks three questions about an actor and a node. The
//! default [`OwnershipPolicy`] answers them the way the fleet has always
//! worked: admins can do anything, users see unowned nodes and their own,
//! and only an owner may edit a node.

use crate::actor::Actor;
use node_store::NodeRecord;

/// Capability an operation needs on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    View,
    Edit,
    Admin,
}

/// Answers per-node permission questions
pub trait Authorization: Send + Sync {
    fn can_view(&self, actor: &Actor, node: &NodeRecord) -> bool;
    fn can_edit(&self, actor: &Actor, node: &NodeRecord) -> bool;
    fn can_admin(&self, actor: &Actor, node: &NodeRecord) -> bool;

    /// Check a [`Capability`]
    fn allows(&self, capability: Capability, actor: &Actor, node: &NodeRecord) -> bool {
        match capability {
            Capability::View => self.can_view(actor, node),
            Capability::Edit => self.can_edit(actor, node),
            Capability::Admin => self.can_admin(actor, node),
        }
    }
}

/// Owner-based permissions with an admin override
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnershipPolicy;

impl Authorization for OwnershipPolicy {
    fn can_view(&self, actor: &Actor, node: &NodeRecord) -> bool {
        if actor.is_admin() {
            return true;
        }
        match (actor.name(), node.owner.as_deref()) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(name), Some(owner)) => name == owner,
        }
    }

    fn can_edit(&self, actor: &Actor, node: &NodeRecord) -> bool {
        actor.is_admin() || (actor.name().is_some() && actor.name() == node.owner.as_deref())
    }

    fn can_admin(&self, actor: &Actor, _node: &NodeRecord) -> bool {
        actor.is_admin()
    }
}
