//! Scope for one `GCPManagedMachinePool` and its control plane.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use kube::api::ListParams;
use kube::{Api, Client, ResourceExt};
use tracing::debug;

use super::{parse_location, ObjectPatcher, ScopeError};
use crate::constants::CLUSTER_NAME_LABEL;
use crate::crd::machine_pool::GCPManagedMachinePoolStatus;
use crate::crd::{GCPManagedControlPlane, GCPManagedMachinePool};

/// Finds the control plane of a Cluster API cluster.
#[async_trait]
pub trait ControlPlaneLookup: Send + Sync {
    async fn find_control_plane(
        &self,
        namespace: &str,
        cluster_name: &str,
    ) -> Result<Option<GCPManagedControlPlane>, kube::Error>;
}

/// [`ControlPlaneLookup`] backed by a label-selected list call.
#[derive(Clone)]
pub struct KubeControlPlaneLookup {
    client: Client,
}

impl Debug for KubeControlPlaneLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeControlPlaneLookup").finish_non_exhaustive()
    }
}

impl KubeControlPlaneLookup {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ControlPlaneLookup for KubeControlPlaneLookup {
    async fn find_control_plane(
        &self,
        namespace: &str,
        cluster_name: &str,
    ) -> Result<Option<GCPManagedControlPlane>, kube::Error> {
        let api: Api<GCPManagedControlPlane> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(&format!("{CLUSTER_NAME_LABEL}={cluster_name}"));
        Ok(api.list(&params).await?.items.into_iter().next())
    }
}

pub struct ManagedMachinePoolScope {
    pub machine_pool: GCPManagedMachinePool,
    /// Owning control plane, read-only.
    pub control_plane: GCPManagedControlPlane,
    original: GCPManagedMachinePool,
    patcher: Arc<dyn ObjectPatcher<GCPManagedMachinePool>>,
}

impl Debug for ManagedMachinePoolScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedMachinePoolScope")
            .field("machine_pool", &self.machine_pool.name_any())
            .field("control_plane", &self.control_plane.name_any())
            .finish_non_exhaustive()
    }
}

impl ManagedMachinePoolScope {
    pub fn new(
        machine_pool: GCPManagedMachinePool,
        control_plane: GCPManagedControlPlane,
        patcher: Arc<dyn ObjectPatcher<GCPManagedMachinePool>>,
    ) -> Self {
        Self {
            original: machine_pool.clone(),
            machine_pool,
            control_plane,
            patcher,
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.machine_pool.name_any()
    }

    #[must_use]
    pub fn node_pool_name(&self) -> String {
        self.machine_pool.node_pool_name()
    }

    #[must_use]
    pub fn region(&self) -> String {
        parse_location(&self.control_plane.spec.location).region
    }

    /// True when the owning cluster spans every zone of its region.
    #[must_use]
    pub fn is_regional(&self) -> bool {
        parse_location(&self.control_plane.spec.location).is_regional()
    }

    /// `projects/{project}/locations/{region}/clusters/{cluster}`
    #[must_use]
    pub fn node_pool_location(&self) -> String {
        format!(
            "projects/{}/locations/{}/clusters/{}",
            self.control_plane.spec.project,
            self.region(),
            self.control_plane.spec.cluster_name
        )
    }

    /// `{node_pool_location}/nodePools/{name}`
    #[must_use]
    pub fn node_pool_full_name(&self) -> String {
        format!("{}/nodePools/{}", self.node_pool_location(), self.node_pool_name())
    }

    pub fn status_mut(&mut self) -> &mut GCPManagedMachinePoolStatus {
        self.machine_pool
            .status
            .get_or_insert_with(Default::default)
    }

    pub fn set_replicas(&mut self, replicas: i32) {
        self.status_mut().replicas = replicas;
    }

    /// Persist status changes made during the pass.
    ///
    /// # Errors
    ///
    /// Returns the failed patch.
    pub async fn close(self) -> Result<(), ScopeError> {
        if self.machine_pool.status == self.original.status {
            debug!(name = %self.name(), "Skipping status patch - status unchanged");
            return Ok(());
        }
        let status = serde_json::to_value(&self.machine_pool.status)
            .map_err(|e| ScopeError::Serialize("status", e))?;
        self.patcher
            .patch_status(&self.machine_pool, status)
            .await?;
        Ok(())
    }
}
