//! Facade wiring the lifecycle components to their collaborators.

use crate::acquisition::AcquisitionCoordinator;
use crate::authz::Authorization;
use crate::config::LifecycleConfig;
use crate::enlistment::EnlistmentWorkflow;
use crate::links::LinkManager;
use crate::nodes::NodeManager;
use crate::transition::TransitionEngine;
use node_store::NodeStore;
use power_client::PowerControl;
use std::sync::Arc;

/// Entry point of the lifecycle core
///
/// Cheap to clone; all components share the same store, authorization
/// policy and power client.
#[derive(Clone)]
pub struct LifecycleService {
    engine: TransitionEngine,
    acquisition: AcquisitionCoordinator,
    enlistment: EnlistmentWorkflow,
    links: LinkManager,
    nodes: NodeManager,
}

impl LifecycleService {
    pub fn new(
        store: Arc<dyn NodeStore>,
        authz: Arc<dyn Authorization>,
        power: Arc<dyn PowerControl>,
        config: LifecycleConfig,
    ) -> Self {
        let engine = TransitionEngine::new(store, authz, config);
        Self {
            acquisition: AcquisitionCoordinator::new(engine.clone(), power),
            enlistment: EnlistmentWorkflow::new(engine.clone()),
            links: LinkManager::new(engine.clone()),
            nodes: NodeManager::new(engine.clone()),
            engine,
        }
    }

    pub fn transitions(&self) -> &TransitionEngine {
        &self.engine
    }

    pub fn acquisition(&self) -> &AcquisitionCoordinator {
        &self.acquisition
    }

    pub fn enlistment(&self) -> &EnlistmentWorkflow {
        &self.enlistment
    }

    pub fn links(&self) -> &LinkManager {
        &self.links
    }

    pub fn nodes(&self) -> &NodeManager {
        &self.nodes
    }
}
