//! Shared fixtures and recording fakes for the integration tests.
//!
//! Every fake records the calls it receives so tests can assert on exactly
//! which GKE and Kubernetes writes a pass produced.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use kube::api::ObjectMeta;
use serde_json::Value;

use gke_cluster_controller::config::ControllerConfig;
use gke_cluster_controller::container::model::{
    AddonsConfig, Channel, Cluster, ClusterStatus, CreateClusterRequest, CreateNodePoolRequest,
    LoggingComponentConfig, LoggingConfig, MasterAuth, MasterAuthorizedNetworksConfig, NodeConfig,
    NodePool, NodePoolStatus, Operation, ReleaseChannel, SetMaintenancePolicyRequest,
    SetNodePoolSizeRequest, ShieldedNodes, StatusCondition, Toggle, UpdateClusterRequest,
    UpdateNodePoolRequest,
};
use gke_cluster_controller::container::{CloudError, ClusterClient, NodePoolClient};
use gke_cluster_controller::controller::backoff::BackoffRegistry;
use gke_cluster_controller::controller::Context;
use gke_cluster_controller::crd::control_plane::GCPManagedControlPlaneStatus;
use gke_cluster_controller::crd::{
    GCPManagedControlPlane, GCPManagedControlPlaneSpec, GCPManagedMachinePool,
    GCPManagedMachinePoolSpec,
};
use gke_cluster_controller::scope::{ControlPlaneLookup, NodePoolLister, ObjectPatcher};
use gke_cluster_controller::services::clusters::kubeconfig::KubeconfigWriter;
use gke_cluster_controller::services::clusters::{ClusterService, KubeconfigSpec};
use gke_cluster_controller::services::nodepools::NodePoolService;

static RUSTLS_INIT: Once = Once::new();

/// Install the ring crypto provider once per test binary.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

pub const NAMESPACE: &str = "default";
pub const CAPI_CLUSTER: &str = "capi-gke";
pub const GKE_CLUSTER: &str = "default-capi-gke";
pub const CLUSTER_FULL_NAME: &str = "projects/my-project/locations/europe-west2/clusters/default-capi-gke";

fn cluster_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(
        "cluster.x-k8s.io/cluster-name".to_string(),
        CAPI_CLUSTER.to_string(),
    )])
}

/// Regional, non-autopilot control plane with its defaults already applied.
pub fn control_plane() -> GCPManagedControlPlane {
    GCPManagedControlPlane {
        metadata: ObjectMeta {
            name: Some(CAPI_CLUSTER.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            labels: Some(cluster_labels()),
            ..ObjectMeta::default()
        },
        spec: GCPManagedControlPlaneSpec {
            cluster_name: GKE_CLUSTER.to_string(),
            project: "my-project".to_string(),
            location: "europe-west2".to_string(),
            network: "default".to_string(),
            ..GCPManagedControlPlaneSpec::default()
        },
        status: None,
    }
}

pub fn autopilot_control_plane() -> GCPManagedControlPlane {
    let mut control_plane = control_plane();
    control_plane.spec.enable_autopilot = true;
    control_plane.spec.release_channel =
        Some(gke_cluster_controller::crd::control_plane::ReleaseChannel::Regular);
    control_plane
}

pub fn ready_control_plane() -> GCPManagedControlPlane {
    let mut control_plane = control_plane();
    control_plane.status = Some(GCPManagedControlPlaneStatus {
        ready: true,
        initialized: true,
        ..GCPManagedControlPlaneStatus::default()
    });
    control_plane
}

pub fn machine_pool(name: &str, node_count: i32) -> GCPManagedMachinePool {
    GCPManagedMachinePool {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            labels: Some(cluster_labels()),
            ..ObjectMeta::default()
        },
        spec: GCPManagedMachinePoolSpec {
            node_count,
            ..GCPManagedMachinePoolSpec::default()
        },
        status: None,
    }
}

/// A running cluster that matches [`control_plane`] exactly.
pub fn running_cluster() -> Cluster {
    Cluster {
        name: GKE_CLUSTER.to_string(),
        status: ClusterStatus::Running,
        endpoint: "34.89.10.20".to_string(),
        current_master_version: "1.29.4-gke.1043002".to_string(),
        master_auth: Some(MasterAuth {
            cluster_ca_certificate: "Q0EtREFUQQ==".to_string(),
        }),
        release_channel: Some(ReleaseChannel {
            channel: Channel::Unspecified,
        }),
        master_authorized_networks_config: Some(MasterAuthorizedNetworksConfig::default()),
        addons_config: Some(AddonsConfig {
            dns_cache_config: Some(Toggle { enabled: false }),
            gce_persistent_disk_csi_driver_config: Some(Toggle { enabled: true }),
        }),
        shielded_nodes: Some(ShieldedNodes { enabled: true }),
        logging_config: Some(LoggingConfig {
            component_config: Some(LoggingComponentConfig::default()),
        }),
        ..Cluster::default()
    }
}

pub fn cluster_with_status(status: ClusterStatus, message: &str) -> Cluster {
    Cluster {
        status,
        conditions: if message.is_empty() {
            Vec::new()
        } else {
            vec![StatusCondition {
                message: message.to_string(),
                ..StatusCondition::default()
            }]
        },
        ..running_cluster()
    }
}

pub fn running_node_pool(name: &str, initial_node_count: i32) -> NodePool {
    NodePool {
        name: name.to_string(),
        initial_node_count,
        config: Some(NodeConfig::default()),
        status: NodePoolStatus::Running,
        ..NodePool::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClusterCall {
    Create(CreateClusterRequest),
    Update(UpdateClusterRequest),
    Delete(String),
    SetMaintenancePolicy(SetMaintenancePolicyRequest),
}

/// GKE cluster API fake. `None` reads as not found.
#[derive(Debug, Default)]
pub struct FakeClusterClient {
    pub cluster: Mutex<Option<Cluster>>,
    pub get_error: Mutex<Option<CloudError>>,
    pub mutate_error: Mutex<Option<CloudError>>,
    pub gets: Mutex<Vec<String>>,
    pub calls: Mutex<Vec<ClusterCall>>,
}

impl FakeClusterClient {
    pub fn with_cluster(cluster: Option<Cluster>) -> Arc<Self> {
        Arc::new(Self {
            cluster: Mutex::new(cluster),
            ..Self::default()
        })
    }

    pub fn set_cluster(&self, cluster: Option<Cluster>) {
        *self.cluster.lock().unwrap() = cluster;
    }

    pub fn calls(&self) -> Vec<ClusterCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: ClusterCall) -> Result<Operation, CloudError> {
        self.calls.lock().unwrap().push(call);
        match self.mutate_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(Operation {
                name: "operation-1".to_string(),
                status: "RUNNING".to_string(),
                ..Operation::default()
            }),
        }
    }
}

#[async_trait]
impl ClusterClient for FakeClusterClient {
    async fn get_cluster(&self, name: &str) -> Result<Cluster, CloudError> {
        self.gets.lock().unwrap().push(name.to_string());
        if let Some(e) = self.get_error.lock().unwrap().clone() {
            return Err(e);
        }
        self.cluster.lock().unwrap().clone().ok_or(CloudError::NotFound)
    }

    async fn create_cluster(&self, request: CreateClusterRequest) -> Result<Operation, CloudError> {
        self.record(ClusterCall::Create(request))
    }

    async fn update_cluster(&self, request: UpdateClusterRequest) -> Result<Operation, CloudError> {
        self.record(ClusterCall::Update(request))
    }

    async fn delete_cluster(&self, name: &str) -> Result<Operation, CloudError> {
        self.record(ClusterCall::Delete(name.to_string()))
    }

    async fn set_maintenance_policy(
        &self,
        request: SetMaintenancePolicyRequest,
    ) -> Result<Operation, CloudError> {
        self.record(ClusterCall::SetMaintenancePolicy(request))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodePoolCall {
    Create(CreateNodePoolRequest),
    Update(UpdateNodePoolRequest),
    SetSize(SetNodePoolSizeRequest),
    Delete(String),
}

/// GKE node pool API fake. `None` reads as not found.
#[derive(Debug, Default)]
pub struct FakeNodePoolClient {
    pub node_pool: Mutex<Option<NodePool>>,
    pub mutate_error: Mutex<Option<CloudError>>,
    pub gets: Mutex<Vec<String>>,
    pub calls: Mutex<Vec<NodePoolCall>>,
}

impl FakeNodePoolClient {
    pub fn with_node_pool(node_pool: Option<NodePool>) -> Arc<Self> {
        Arc::new(Self {
            node_pool: Mutex::new(node_pool),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<NodePoolCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: NodePoolCall) -> Result<Operation, CloudError> {
        self.calls.lock().unwrap().push(call);
        match self.mutate_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(Operation::default()),
        }
    }
}

#[async_trait]
impl NodePoolClient for FakeNodePoolClient {
    async fn get_node_pool(&self, name: &str) -> Result<NodePool, CloudError> {
        self.gets.lock().unwrap().push(name.to_string());
        self.node_pool.lock().unwrap().clone().ok_or(CloudError::NotFound)
    }

    async fn create_node_pool(
        &self,
        request: CreateNodePoolRequest,
    ) -> Result<Operation, CloudError> {
        self.record(NodePoolCall::Create(request))
    }

    async fn update_node_pool(
        &self,
        request: UpdateNodePoolRequest,
    ) -> Result<Operation, CloudError> {
        self.record(NodePoolCall::Update(request))
    }

    async fn set_node_pool_size(
        &self,
        request: SetNodePoolSizeRequest,
    ) -> Result<Operation, CloudError> {
        self.record(NodePoolCall::SetSize(request))
    }

    async fn delete_node_pool(&self, name: &str) -> Result<Operation, CloudError> {
        self.record(NodePoolCall::Delete(name.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct FakeKubeconfigWriter {
    pub written: Mutex<Vec<(KubeconfigSpec, String)>>,
}

#[async_trait]
impl KubeconfigWriter for FakeKubeconfigWriter {
    async fn write_kubeconfig(
        &self,
        spec: &KubeconfigSpec,
        kubeconfig: String,
    ) -> Result<(), kube::Error> {
        self.written.lock().unwrap().push((spec.clone(), kubeconfig));
        Ok(())
    }
}

/// Returns the same machine pools for every cluster.
#[derive(Debug, Default)]
pub struct FakeLister {
    pub pools: Mutex<Vec<GCPManagedMachinePool>>,
}

impl FakeLister {
    pub fn with_pools(pools: Vec<GCPManagedMachinePool>) -> Arc<Self> {
        Arc::new(Self {
            pools: Mutex::new(pools),
        })
    }
}

#[async_trait]
impl NodePoolLister for FakeLister {
    async fn list_machine_pools(
        &self,
        _namespace: &str,
        _cluster_name: &str,
    ) -> Result<Vec<GCPManagedMachinePool>, kube::Error> {
        Ok(self.pools.lock().unwrap().clone())
    }
}

#[derive(Debug, Default)]
pub struct FakeLookup {
    pub control_plane: Mutex<Option<GCPManagedControlPlane>>,
}

#[async_trait]
impl ControlPlaneLookup for FakeLookup {
    async fn find_control_plane(
        &self,
        _namespace: &str,
        _cluster_name: &str,
    ) -> Result<Option<GCPManagedControlPlane>, kube::Error> {
        Ok(self.control_plane.lock().unwrap().clone())
    }
}

/// Records every patch body by kind.
#[derive(Debug, Default)]
pub struct RecordingPatcher {
    pub status: Mutex<Vec<Value>>,
    pub spec: Mutex<Vec<Value>>,
    pub metadata: Mutex<Vec<Value>>,
}

impl RecordingPatcher {
    pub fn status_patches(&self) -> Vec<Value> {
        self.status.lock().unwrap().clone()
    }

    pub fn spec_patches(&self) -> Vec<Value> {
        self.spec.lock().unwrap().clone()
    }

    pub fn metadata_patches(&self) -> Vec<Value> {
        self.metadata.lock().unwrap().clone()
    }

    pub fn last_status(&self) -> Option<Value> {
        self.status.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl<K: Send + Sync> ObjectPatcher<K> for RecordingPatcher {
    async fn patch_status(&self, _object: &K, status: Value) -> Result<(), kube::Error> {
        self.status.lock().unwrap().push(status);
        Ok(())
    }

    async fn patch_spec(&self, _object: &K, spec: Value) -> Result<(), kube::Error> {
        self.spec.lock().unwrap().push(spec);
        Ok(())
    }

    async fn patch_metadata(&self, _object: &K, metadata: Value) -> Result<(), kube::Error> {
        self.metadata.lock().unwrap().push(metadata);
        Ok(())
    }
}

/// Every fake behind one controller context.
#[derive(Debug)]
pub struct Harness {
    pub clusters: Arc<FakeClusterClient>,
    pub node_pools: Arc<FakeNodePoolClient>,
    pub kubeconfig: Arc<FakeKubeconfigWriter>,
    pub lister: Arc<FakeLister>,
    pub lookup: Arc<FakeLookup>,
    pub control_plane_patcher: Arc<RecordingPatcher>,
    pub machine_pool_patcher: Arc<RecordingPatcher>,
}

impl Harness {
    pub fn new(cluster: Option<Cluster>, node_pool: Option<NodePool>) -> Self {
        Self {
            clusters: FakeClusterClient::with_cluster(cluster),
            node_pools: FakeNodePoolClient::with_node_pool(node_pool),
            kubeconfig: Arc::new(FakeKubeconfigWriter::default()),
            lister: Arc::new(FakeLister::default()),
            lookup: Arc::new(FakeLookup::default()),
            control_plane_patcher: Arc::new(RecordingPatcher::default()),
            machine_pool_patcher: Arc::new(RecordingPatcher::default()),
        }
    }

    pub fn cluster_service(&self) -> ClusterService {
        ClusterService::new(self.clusters.clone(), self.kubeconfig.clone())
    }

    pub fn node_pool_service(&self) -> NodePoolService {
        NodePoolService::new(self.node_pools.clone())
    }

    pub fn context(&self) -> Arc<Context> {
        let config = ControllerConfig::default();
        Arc::new(Context {
            clusters: self.cluster_service(),
            node_pools: self.node_pool_service(),
            lister: self.lister.clone(),
            control_planes: self.lookup.clone(),
            control_plane_patcher: self.control_plane_patcher.clone(),
            machine_pool_patcher: self.machine_pool_patcher.clone(),
            backoff: BackoffRegistry::new(config.backoff_min_minutes, config.backoff_max_minutes),
            config,
        })
    }
}

/// Status condition entry of a patch body.
pub fn condition<'a>(status: &'a Value, condition_type: &str) -> Option<&'a Value> {
    status["conditions"]
        .as_array()?
        .iter()
        .find(|c| c["type"] == condition_type)
}
