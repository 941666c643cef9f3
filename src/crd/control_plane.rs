//! # GCPManagedControlPlane
//!
//! Desired state of a GKE cluster control plane.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::condition::{Condition, ConditionSetter};

/// GCPManagedControlPlane Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: infrastructure.cluster.x-k8s.io/v1beta1
/// kind: GCPManagedControlPlane
/// metadata:
///   name: capi-gke
///   namespace: default
///   labels:
///     cluster.x-k8s.io/cluster-name: capi-gke
/// spec:
///   project: my-project
///   location: europe-west2
///   network: default
///   releaseChannel: regular
/// ```
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "GCPManagedControlPlane",
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1beta1",
    namespaced,
    status = "GCPManagedControlPlaneStatus",
    shortname = "gcpmcp",
    category = "cluster-api",
    printcolumn = r#"{"name":"Cluster", "type":"string", "jsonPath":".metadata.labels.cluster\\.x-k8s\\.io/cluster-name"}, {"name":"Ready", "type":"boolean", "jsonPath":".status.ready"}, {"name":"CurrentVersion", "type":"string", "jsonPath":".status.currentVersion"}, {"name":"Endpoint", "type":"string", "jsonPath":".spec.endpoint.host"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GCPManagedControlPlaneSpec {
    /// Name of the GKE cluster. Generated from namespace and name when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_name: String,
    /// GCP project the cluster lives in
    pub project: String,
    /// Region or zone of the cluster, e.g. `europe-west2` or `europe-west2-a`
    pub location: String,
    /// VPC network name used when creating the cluster
    #[serde(default)]
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_ipv4_cidr: Option<String>,
    #[serde(default)]
    pub enable_autopilot: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_channel: Option<ReleaseChannel>,
    /// Kubernetes version of the control plane. The channel default is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane_version: Option<String>,
    /// API server endpoint, written by the controller
    #[serde(default)]
    pub endpoint: ApiEndpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addons_config: Option<AddonsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging_config: Option<LoggingConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_authorized_networks_config: Option<MasterAuthorizedNetworksConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_config: Option<NetworkConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_cluster_config: Option<PrivateClusterConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_identity_config: Option<WorkloadIdentityConfig>,
    /// Labels applied to the GKE cluster resource
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resource_labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_allocation_policy: Option<IPAllocationPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_policy: Option<MaintenancePolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_max_pods_constraint: Option<MaxPodsConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shielded_nodes: Option<ShieldedNodes>,
}

/// Observed state of the control plane.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GCPManagedControlPlaneStatus {
    /// The control plane is reachable and converged
    #[serde(default)]
    pub ready: bool,
    /// The control plane has been created at least once
    #[serde(default)]
    pub initialized: bool,
    /// Version reported by GKE
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub current_version: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiEndpoint {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseChannel {
    Rapid,
    Regular,
    Stable,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_cache_config: Option<AddonToggle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gce_persistent_disk_csi_driver_config: Option<AddonToggle>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct AddonToggle {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_components: Vec<LoggingComponent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum LoggingComponent {
    #[serde(rename = "system-components")]
    SystemComponents,
    #[serde(rename = "workloads")]
    Workloads,
    #[serde(rename = "apiserver")]
    ApiServer,
    #[serde(rename = "scheduler")]
    Scheduler,
    #[serde(rename = "controller-manager")]
    ControllerManager,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MasterAuthorizedNetworksConfig {
    #[serde(default)]
    pub cidr_blocks: Vec<CidrBlock>,
    /// Whether Google Compute Engine public IPs can reach the master
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp_public_cidrs_access_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CidrBlock {
    #[serde(default)]
    pub display_name: String,
    pub cidr_block: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datapath_provider: Option<DatapathProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_config: Option<DnsConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DatapathProvider {
    Legacy,
    Advanced,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DnsConfig {
    #[serde(rename = "clusterDNS", default, skip_serializing_if = "Option::is_none")]
    pub cluster_dns: Option<ClusterDns>,
    #[serde(rename = "clusterDNSScope", default, skip_serializing_if = "Option::is_none")]
    pub cluster_dns_scope: Option<ClusterDnsScope>,
    #[serde(rename = "clusterDNSDomain", default, skip_serializing_if = "Option::is_none")]
    pub cluster_dns_domain: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum ClusterDns {
    #[serde(rename = "platform")]
    PlatformDefault,
    #[serde(rename = "cloud-dns")]
    CloudDns,
    #[serde(rename = "kube-dns")]
    KubeDns,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClusterDnsScope {
    Cluster,
    Vpc,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrivateClusterConfig {
    #[serde(default)]
    pub enable_private_nodes: bool,
    #[serde(default)]
    pub enable_private_endpoint: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_ipv4_cidr_block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_cluster_master_global_access_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_endpoint_subnetwork: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadIdentityConfig {
    pub workload_pool: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IPAllocationPolicy {
    #[serde(rename = "useIPAliases", default, skip_serializing_if = "Option::is_none")]
    pub use_ip_aliases: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_secondary_range_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services_secondary_range_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_ipv4_cidr_block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services_ipv4_cidr_block: Option<String>,
}

/// Maintenance windows and exclusions.
///
/// Only one of the daily and recurring windows may be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaintenancePolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_maintenance_window: Option<DailyMaintenanceWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_maintenance_window: Option<RecurringMaintenanceWindow>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub maintenance_exclusions: BTreeMap<String, TimeWindow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyMaintenanceWindow {
    /// Start time in `HH:MM` format, GMT
    pub start_time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecurringMaintenanceWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<TimeWindow>,
    /// RFC5545 RRULE
    pub recurrence: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    /// RFC3339
    pub start_time: String,
    /// RFC3339
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_exclusion_option: Option<MaintenanceExclusionOption>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum MaintenanceExclusionOption {
    NoUpgrades,
    NoMinorUpgrades,
    NoMinorOrNodeUpgrades,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaxPodsConstraint {
    pub max_pods_per_node: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct ShieldedNodes {
    #[serde(default)]
    pub enabled: bool,
}

impl ConditionSetter for GCPManagedControlPlane {
    fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map_or(&[], |status| status.conditions.as_slice())
    }

    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.status.get_or_insert_with(Default::default).conditions
    }
}
