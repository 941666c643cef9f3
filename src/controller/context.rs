//! # Controller Context
//!
//! Shared state handed to every reconcile and error-policy call.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use kube::Client;
use thiserror::Error;

use super::backoff::BackoffRegistry;
use crate::config::ControllerConfig;
use crate::container::{ClusterClient, ContainerREST};
use crate::crd::{GCPManagedControlPlane, GCPManagedMachinePool};
use crate::scope::{
    ControlPlaneLookup, KubeControlPlaneLookup, KubeMachinePoolLister, KubePatcher,
    NodePoolLister, ObjectPatcher, ScopeError,
};
use crate::services::clusters::{ClusterService, SecretKubeconfigWriter};
use crate::services::nodepools::NodePoolService;
use crate::services::ServiceError;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    #[error("reconcile of {0} timed out after {1:?}")]
    Timeout(String, Duration),
}

pub struct Context {
    pub config: ControllerConfig,
    pub clusters: ClusterService,
    pub node_pools: NodePoolService,
    pub lister: Arc<dyn NodePoolLister>,
    pub control_planes: Arc<dyn ControlPlaneLookup>,
    pub control_plane_patcher: Arc<dyn ObjectPatcher<GCPManagedControlPlane>>,
    pub machine_pool_patcher: Arc<dyn ObjectPatcher<GCPManagedMachinePool>>,
    /// Per-resource error backoff, keyed `kind/namespace/name`.
    pub backoff: BackoffRegistry,
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Wire the production implementations of every seam.
    #[must_use]
    pub fn new(client: Client, config: ControllerConfig, container: Arc<ContainerREST>) -> Self {
        let patcher = Arc::new(KubePatcher::new(client.clone()));
        let cluster_client: Arc<dyn ClusterClient> = Arc::<ContainerREST>::clone(&container);
        let control_plane_patcher: Arc<dyn ObjectPatcher<GCPManagedControlPlane>> =
            Arc::<KubePatcher>::clone(&patcher);
        let backoff = BackoffRegistry::new(config.backoff_min_minutes, config.backoff_max_minutes);
        Self {
            clusters: ClusterService::new(
                cluster_client,
                Arc::new(SecretKubeconfigWriter::new(client.clone())),
            ),
            node_pools: NodePoolService::new(container),
            lister: Arc::new(KubeMachinePoolLister::new(client.clone())),
            control_planes: Arc::new(KubeControlPlaneLookup::new(client)),
            control_plane_patcher,
            machine_pool_patcher: patcher,
            backoff,
            config,
        }
    }
}
