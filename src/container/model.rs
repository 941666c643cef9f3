//! GKE Container API v1 resource and request types.
//!
//! These structs mirror the JSON payloads of the REST API closely enough for
//! the reconcilers. Absent fields deserialize to their defaults so an
//! observed object never fails to parse because GKE omitted a disabled
//! feature.
//!
//! References:
//! - [Container API v1 REST reference](https://cloud.google.com/kubernetes-engine/docs/reference/rest/v1/projects.locations.clusters)

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Declares a string-backed API enum.
///
/// Unknown values are kept in an `Other` variant instead of failing
/// deserialization, so newer API values surface as an unexpected status
/// rather than a decode error.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident default $default:ident {
            $($variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            #[must_use]
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $wire,)+
                    Self::Other(value) => value,
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                match value.as_str() {
                    $($wire => Self::$variant,)+
                    _ => Self::Other(value),
                }
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// Lifecycle status of a GKE cluster.
    ClusterStatus default Unspecified {
        Unspecified => "STATUS_UNSPECIFIED",
        Provisioning => "PROVISIONING",
        Running => "RUNNING",
        Reconciling => "RECONCILING",
        Stopping => "STOPPING",
        Error => "ERROR",
        Degraded => "DEGRADED",
    }
}

wire_enum! {
    /// Lifecycle status of a GKE node pool.
    NodePoolStatus default Unspecified {
        Unspecified => "STATUS_UNSPECIFIED",
        Provisioning => "PROVISIONING",
        Running => "RUNNING",
        RunningWithError => "RUNNING_WITH_ERROR",
        Reconciling => "RECONCILING",
        Stopping => "STOPPING",
        Error => "ERROR",
    }
}

wire_enum! {
    Channel default Unspecified {
        Unspecified => "UNSPECIFIED",
        Rapid => "RAPID",
        Regular => "REGULAR",
        Stable => "STABLE",
    }
}

wire_enum! {
    LoggingComponent default Unspecified {
        Unspecified => "COMPONENT_UNSPECIFIED",
        SystemComponents => "SYSTEM_COMPONENTS",
        Workloads => "WORKLOADS",
        ApiServer => "APISERVER",
        Scheduler => "SCHEDULER",
        ControllerManager => "CONTROLLER_MANAGER",
    }
}

wire_enum! {
    DatapathProvider default Unspecified {
        Unspecified => "DATAPATH_PROVIDER_UNSPECIFIED",
        LegacyDatapath => "LEGACY_DATAPATH",
        AdvancedDatapath => "ADVANCED_DATAPATH",
    }
}

wire_enum! {
    DnsProvider default Unspecified {
        Unspecified => "PROVIDER_UNSPECIFIED",
        PlatformDefault => "PLATFORM_DEFAULT",
        CloudDns => "CLOUD_DNS",
        KubeDns => "KUBE_DNS",
    }
}

wire_enum! {
    DnsScope default Unspecified {
        Unspecified => "DNS_SCOPE_UNSPECIFIED",
        ClusterScope => "CLUSTER_SCOPE",
        VpcScope => "VPC_SCOPE",
    }
}

wire_enum! {
    ExclusionScope default NoUpgrades {
        NoUpgrades => "NO_UPGRADES",
        NoMinorUpgrades => "NO_MINOR_UPGRADES",
        NoMinorOrNodeUpgrades => "NO_MINOR_OR_NODE_UPGRADES",
    }
}

wire_enum! {
    TaintEffect default Unspecified {
        Unspecified => "EFFECT_UNSPECIFIED",
        NoSchedule => "NO_SCHEDULE",
        PreferNoSchedule => "PREFER_NO_SCHEDULE",
        NoExecute => "NO_EXECUTE",
    }
}

wire_enum! {
    LocationPolicy default Unspecified {
        Unspecified => "LOCATION_POLICY_UNSPECIFIED",
        Balanced => "BALANCED",
        Any => "ANY",
    }
}

/// int64 fields travel as JSON strings.
mod int64_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(n),
            Raw::Text(s) => s.parse().map_err(de::Error::custom),
        }
    }
}

/// A GKE cluster.
///
/// API Reference: https://cloud.google.com/kubernetes-engine/docs/reference/rest/v1/projects.locations.clusters#Cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cluster {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub network: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_ipv4_cidr: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub node_pools: Vec<NodePool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autopilot: Option<Autopilot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_channel: Option<ReleaseChannel>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub resource_labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addons_config: Option<AddonsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging_config: Option<LoggingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_authorized_networks_config: Option<MasterAuthorizedNetworksConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_config: Option<NetworkConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_cluster_config: Option<PrivateClusterConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shielded_nodes: Option<ShieldedNodes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workload_identity_config: Option<WorkloadIdentityConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_policy: Option<MaintenancePolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_allocation_policy: Option<IpAllocationPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_max_pods_constraint: Option<MaxPodsConstraint>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub initial_cluster_version: String,
    // Output only.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub current_master_version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub status: ClusterStatus,
    #[serde(skip_serializing)]
    pub conditions: Vec<StatusCondition>,
    #[serde(skip_serializing)]
    pub master_auth: Option<MasterAuth>,
    #[serde(skip_serializing)]
    pub self_link: String,
}

/// A GKE node pool.
///
/// API Reference: https://cloud.google.com/kubernetes-engine/docs/reference/rest/v1/projects.locations.clusters.nodePools#NodePool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodePool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<NodeConfig>,
    pub initial_node_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoscaling: Option<NodePoolAutoscaling>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing)]
    pub status: NodePoolStatus,
    #[serde(skip_serializing)]
    pub conditions: Vec<StatusCondition>,
    #[serde(skip_serializing)]
    pub self_link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub machine_type: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub disk_size_gb: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub disk_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image_type: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub local_ssd_count: i32,
    pub labels: BTreeMap<String, String>,
    pub taints: Vec<NodeTaint>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub resource_labels: BTreeMap<String, String>,
}

#[allow(clippy::trivially_copy_pass_by_ref, reason = "serde skip_serializing_if passes a reference")]
fn is_zero(value: &i32) -> bool {
    *value == 0
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeTaint {
    pub key: String,
    pub value: String,
    pub effect: TaintEffect,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodePoolAutoscaling {
    pub enabled: bool,
    pub min_node_count: i32,
    pub max_node_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_policy: Option<LocationPolicy>,
}

/// Remote status condition; only the message is surfaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusCondition {
    pub code: Option<String>,
    pub message: String,
    pub canonical_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MasterAuth {
    pub cluster_ca_certificate: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Autopilot {
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseChannel {
    pub channel: Channel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Toggle {
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddonsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_cache_config: Option<Toggle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gce_persistent_disk_csi_driver_config: Option<Toggle>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_config: Option<LoggingComponentConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingComponentConfig {
    pub enable_components: Vec<LoggingComponent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MasterAuthorizedNetworksConfig {
    pub enabled: bool,
    pub cidr_blocks: Vec<CidrBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_public_cidrs_access_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CidrBlock {
    pub display_name: String,
    pub cidr_block: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datapath_provider: Option<DatapathProvider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_config: Option<DnsConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DnsConfig {
    pub cluster_dns: DnsProvider,
    pub cluster_dns_scope: DnsScope,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_dns_domain: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivateClusterConfig {
    pub enable_private_nodes: bool,
    pub enable_private_endpoint: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub master_ipv4_cidr_block: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_global_access_config: Option<Toggle>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub private_endpoint_subnetwork: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShieldedNodes {
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkloadIdentityConfig {
    pub workload_pool: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IpAllocationPolicy {
    pub use_ip_aliases: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_secondary_range_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub services_secondary_range_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_ipv4_cidr_block: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub services_ipv4_cidr_block: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaxPodsConstraint {
    #[serde(with = "int64_string")]
    pub max_pods_per_node: i64,
}

/// API Reference: https://cloud.google.com/kubernetes-engine/docs/reference/rest/v1/projects.locations.clusters#MaintenancePolicy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaintenancePolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<MaintenanceWindow>,
    /// Fingerprint used for optimistic concurrency on updates
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resource_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaintenanceWindow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_maintenance_window: Option<DailyMaintenanceWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_window: Option<RecurringTimeWindow>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub maintenance_exclusions: BTreeMap<String, TimeWindow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyMaintenanceWindow {
    pub start_time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecurringTimeWindow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<TimeWindow>,
    pub recurrence: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeWindow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_exclusion_options: Option<MaintenanceExclusionOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceExclusionOptions {
    pub scope: ExclusionScope,
}

/// Long-running operation handle. Returned by every mutating call and never
/// polled; the next reconcile observes the result through a fresh read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Operation {
    pub name: String,
    pub operation_type: String,
    pub status: String,
    pub self_link: String,
    pub target_link: String,
}

/// Fields of a cluster that can be changed by `clusters.update`.
///
/// GKE accepts exactly one populated field per call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_release_channel: Option<ReleaseChannel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_master_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_master_authorized_networks_config: Option<MasterAuthorizedNetworksConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_addons_config: Option<AddonsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_dns_config: Option<DnsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_private_cluster_config: Option<PrivateClusterConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_shielded_nodes: Option<ShieldedNodes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_workload_identity_config: Option<WorkloadIdentityConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_logging_config: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClusterRequest {
    pub parent: String,
    pub cluster: Cluster,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClusterRequest {
    pub name: String,
    pub update: ClusterUpdate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetMaintenancePolicyRequest {
    pub name: String,
    pub maintenance_policy: MaintenancePolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodePoolRequest {
    pub parent: String,
    pub node_pool: NodePool,
}

/// Version, image, label and taint changes of a node pool, sent together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNodePoolRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<NodeLabels>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taints: Option<NodeTaints>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLabels {
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTaints {
    pub taints: Vec<NodeTaint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetNodePoolSizeRequest {
    pub name: String,
    pub node_count: i32,
}
