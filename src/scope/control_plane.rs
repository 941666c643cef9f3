//! Scope for one `GCPManagedControlPlane`.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use kube::api::ListParams;
use kube::{Api, Client, ResourceExt};
use tracing::debug;

use super::{parse_location, Location, ObjectPatcher, ScopeError};
use crate::constants::{CLUSTER_NAME_LABEL, CONTROL_PLANE_ENDPOINT_PORT};
use crate::crd::control_plane::{ApiEndpoint, GCPManagedControlPlaneStatus};
use crate::crd::{GCPManagedControlPlane, GCPManagedMachinePool};

/// Lists machine pools that belong to one Cluster API cluster.
#[async_trait]
pub trait NodePoolLister: Send + Sync {
    async fn list_machine_pools(
        &self,
        namespace: &str,
        cluster_name: &str,
    ) -> Result<Vec<GCPManagedMachinePool>, kube::Error>;
}

/// [`NodePoolLister`] backed by a label-selected list call.
#[derive(Clone)]
pub struct KubeMachinePoolLister {
    client: Client,
}

impl Debug for KubeMachinePoolLister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeMachinePoolLister").finish_non_exhaustive()
    }
}

impl KubeMachinePoolLister {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NodePoolLister for KubeMachinePoolLister {
    async fn list_machine_pools(
        &self,
        namespace: &str,
        cluster_name: &str,
    ) -> Result<Vec<GCPManagedMachinePool>, kube::Error> {
        let api: Api<GCPManagedMachinePool> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(&format!("{CLUSTER_NAME_LABEL}={cluster_name}"));
        Ok(api.list(&params).await?.items)
    }
}

/// Per-pass view of a control plane.
///
/// Reconcilers mutate `control_plane` directly (status, conditions, endpoint);
/// [`ManagedControlPlaneScope::close`] writes back whatever differs from the
/// object as it was read.
pub struct ManagedControlPlaneScope {
    pub control_plane: GCPManagedControlPlane,
    original: GCPManagedControlPlane,
    lister: Arc<dyn NodePoolLister>,
    patcher: Arc<dyn ObjectPatcher<GCPManagedControlPlane>>,
}

impl Debug for ManagedControlPlaneScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedControlPlaneScope")
            .field("control_plane", &self.control_plane.name_any())
            .finish_non_exhaustive()
    }
}

impl ManagedControlPlaneScope {
    pub fn new(
        control_plane: GCPManagedControlPlane,
        lister: Arc<dyn NodePoolLister>,
        patcher: Arc<dyn ObjectPatcher<GCPManagedControlPlane>>,
    ) -> Self {
        Self {
            original: control_plane.clone(),
            control_plane,
            lister,
            patcher,
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.control_plane.name_any()
    }

    #[must_use]
    pub fn namespace(&self) -> String {
        self.control_plane.namespace().unwrap_or_default()
    }

    #[must_use]
    pub fn project(&self) -> &str {
        &self.control_plane.spec.project
    }

    #[must_use]
    pub fn location(&self) -> Location {
        parse_location(&self.control_plane.spec.location)
    }

    #[must_use]
    pub fn region(&self) -> String {
        self.location().region
    }

    /// GKE cluster name.
    #[must_use]
    pub fn cluster_name(&self) -> &str {
        &self.control_plane.spec.cluster_name
    }

    /// `projects/{project}/locations/{region}`
    #[must_use]
    pub fn cluster_location(&self) -> String {
        format!("projects/{}/locations/{}", self.project(), self.region())
    }

    /// `projects/{project}/locations/{region}/clusters/{name}`
    #[must_use]
    pub fn cluster_full_name(&self) -> String {
        format!("{}/clusters/{}", self.cluster_location(), self.cluster_name())
    }

    /// Value of the Cluster API cluster-name label.
    #[must_use]
    pub fn owner_cluster(&self) -> Option<&str> {
        self.control_plane
            .metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(CLUSTER_NAME_LABEL))
            .map(String::as_str)
    }

    #[must_use]
    pub fn is_autopilot(&self) -> bool {
        self.control_plane.spec.enable_autopilot
    }

    pub fn status_mut(&mut self) -> &mut GCPManagedControlPlaneStatus {
        self.control_plane
            .status
            .get_or_insert_with(Default::default)
    }

    pub fn set_endpoint(&mut self, host: &str) {
        self.control_plane.spec.endpoint = ApiEndpoint {
            host: host.to_string(),
            port: CONTROL_PLANE_ENDPOINT_PORT,
        };
    }

    /// Machine pools in this namespace that carry the same cluster-name label.
    ///
    /// # Errors
    ///
    /// Fails when the control plane has no cluster-name label or the list call fails.
    pub async fn owned_machine_pools(&self) -> Result<Vec<GCPManagedMachinePool>, ScopeError> {
        let cluster = self
            .owner_cluster()
            .ok_or_else(|| ScopeError::MissingClusterLabel {
                kind: "GCPManagedControlPlane",
                name: self.name(),
                label: CLUSTER_NAME_LABEL,
            })?;
        Ok(self
            .lister
            .list_machine_pools(&self.namespace(), cluster)
            .await?)
    }

    /// Persist status and endpoint changes made during the pass.
    ///
    /// # Errors
    ///
    /// Returns the first failed patch.
    pub async fn close(self) -> Result<(), ScopeError> {
        if self.control_plane.status != self.original.status {
            let status = serde_json::to_value(&self.control_plane.status)
                .map_err(|e| ScopeError::Serialize("status", e))?;
            self.patcher
                .patch_status(&self.control_plane, status)
                .await?;
        } else {
            debug!(name = %self.name(), "Skipping status patch - status unchanged");
        }

        if self.control_plane.spec.endpoint != self.original.spec.endpoint {
            let endpoint = serde_json::to_value(&self.control_plane.spec.endpoint)
                .map_err(|e| ScopeError::Serialize("endpoint", e))?;
            self.patcher
                .patch_spec(&self.control_plane, serde_json::json!({ "endpoint": endpoint }))
                .await?;
        }
        Ok(())
    }
}
