//! Client seams for the GKE Container API.
//!
//! The reconcilers only see these traits. [`ContainerREST`](super::ContainerREST)
//! implements both against the real API and tests substitute recording fakes.

use async_trait::async_trait;
use thiserror::Error;

use super::model::{
    Cluster, CreateClusterRequest, CreateNodePoolRequest, NodePool, Operation,
    SetMaintenancePolicyRequest, SetNodePoolSizeRequest, UpdateClusterRequest,
    UpdateNodePoolRequest,
};

/// Errors returned by the Container API.
///
/// `NotFound` is the only code the reconcilers branch on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CloudError {
    #[error("resource not found")]
    NotFound,
    #[error("GKE API error: {message} (code: {code}, status: {status})")]
    Api {
        code: u16,
        status: String,
        message: String,
    },
    #[error("failed to obtain access token: {0}")]
    Auth(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl CloudError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Cluster operations used by the cluster reconciler.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn get_cluster(&self, name: &str) -> Result<Cluster, CloudError>;
    async fn create_cluster(&self, request: CreateClusterRequest) -> Result<Operation, CloudError>;
    async fn update_cluster(&self, request: UpdateClusterRequest) -> Result<Operation, CloudError>;
    async fn delete_cluster(&self, name: &str) -> Result<Operation, CloudError>;
    async fn set_maintenance_policy(
        &self,
        request: SetMaintenancePolicyRequest,
    ) -> Result<Operation, CloudError>;
}

/// Node pool operations used by the node pool reconciler.
#[async_trait]
pub trait NodePoolClient: Send + Sync {
    async fn get_node_pool(&self, name: &str) -> Result<NodePool, CloudError>;
    async fn create_node_pool(
        &self,
        request: CreateNodePoolRequest,
    ) -> Result<Operation, CloudError>;
    async fn update_node_pool(
        &self,
        request: UpdateNodePoolRequest,
    ) -> Result<Operation, CloudError>;
    async fn set_node_pool_size(
        &self,
        request: SetNodePoolSizeRequest,
    ) -> Result<Operation, CloudError>;
    async fn delete_node_pool(&self, name: &str) -> Result<Operation, CloudError>;
}
