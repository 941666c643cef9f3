//! # Scopes
//!
//! A scope bundles one managed object with the helpers a reconcile pass needs
//! to read its owner relationships and persist what changed. Scopes are built
//! fresh for every pass and closed at the end of it.

mod control_plane;
mod machine_pool;

pub use control_plane::{KubeMachinePoolLister, ManagedControlPlaneScope, NodePoolLister};
pub use machine_pool::{ControlPlaneLookup, KubeControlPlaneLookup, ManagedMachinePoolScope};

use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::constants::FIELD_MANAGER;

#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    #[error("{kind} {name} has no {label} label")]
    MissingClusterLabel {
        kind: &'static str,
        name: String,
        label: &'static str,
    },
    #[error("failed to serialize {0}: {1}")]
    Serialize(&'static str, #[source] serde_json::Error),
}

/// Region and optional zone of a GKE location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub region: String,
    pub zone: Option<String>,
}

impl Location {
    /// Regional locations have no zone suffix.
    #[must_use]
    pub fn is_regional(&self) -> bool {
        self.zone.is_none()
    }
}

/// Split `us-central1` or `us-central1-a` into region and zone.
#[must_use]
pub fn parse_location(location: &str) -> Location {
    let parts: Vec<&str> = location.split('-').collect();
    if parts.len() <= 2 {
        return Location {
            region: location.to_string(),
            zone: None,
        };
    }
    Location {
        region: parts[..2].join("-"),
        zone: Some(parts[2..].join("-")),
    }
}

/// Persists changed parts of a managed object.
///
/// All calls are JSON merge patches; the body is the fragment to merge.
#[async_trait]
pub trait ObjectPatcher<K>: Send + Sync {
    async fn patch_status(&self, object: &K, status: Value) -> Result<(), kube::Error>;
    async fn patch_spec(&self, object: &K, spec: Value) -> Result<(), kube::Error>;
    /// Used for finalizers.
    async fn patch_metadata(&self, object: &K, metadata: Value) -> Result<(), kube::Error>;
}

/// [`ObjectPatcher`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubePatcher {
    client: Client,
}

impl Debug for KubePatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubePatcher").finish_non_exhaustive()
    }
}

impl KubePatcher {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, object: &K) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(
            self.client.clone(),
            object.meta().namespace.as_deref().unwrap_or("default"),
        )
    }
}

#[async_trait]
impl<K> ObjectPatcher<K> for KubePatcher
where
    K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug + Send + Sync,
    <K as Resource>::DynamicType: Default,
{
    async fn patch_status(&self, object: &K, status: Value) -> Result<(), kube::Error> {
        let name = object.meta().name.as_deref().unwrap_or_default();
        self.api(object)
            .patch_status(
                name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(serde_json::json!({ "status": status })),
            )
            .await?;
        Ok(())
    }

    async fn patch_spec(&self, object: &K, spec: Value) -> Result<(), kube::Error> {
        let name = object.meta().name.as_deref().unwrap_or_default();
        self.api(object)
            .patch(
                name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(serde_json::json!({ "spec": spec })),
            )
            .await?;
        Ok(())
    }

    async fn patch_metadata(&self, object: &K, metadata: Value) -> Result<(), kube::Error> {
        let name = object.meta().name.as_deref().unwrap_or_default();
        self.api(object)
            .patch(
                name,
                &PatchParams::default(),
                &Patch::Merge(serde_json::json!({ "metadata": metadata })),
            )
            .await?;
        Ok(())
    }
}
