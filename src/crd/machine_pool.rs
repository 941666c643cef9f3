//! # GCPManagedMachinePool
//!
//! Desired state of one GKE node pool.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::condition::{Condition, ConditionSetter};

/// GCPManagedMachinePool Custom Resource Definition
///
/// Maps 1:1 to a GKE node pool of the control plane that carries the same
/// `cluster.x-k8s.io/cluster-name` label.
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "GCPManagedMachinePool",
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1beta1",
    namespaced,
    status = "GCPManagedMachinePoolStatus",
    shortname = "gcpmmp",
    category = "cluster-api",
    printcolumn = r#"{"name":"Ready", "type":"boolean", "jsonPath":".status.ready"}, {"name":"Replicas", "type":"integer", "jsonPath":".status.replicas"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GCPManagedMachinePoolSpec {
    /// GKE node pool name. Defaults to the object name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_pool_name: Option<String>,
    /// Initial node count. Per zone for regional clusters.
    pub node_count: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_ssd_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling: Option<NodePoolAutoScaling>,
    /// Labels applied to the Kubernetes nodes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub kubernetes_labels: BTreeMap<String, String>,
    /// Taints applied to the Kubernetes nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kubernetes_taints: Vec<Taint>,
    /// Instance metadata of the nodes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_labels: BTreeMap<String, String>,
    /// Labels applied to the underlying GCP resources
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resource_labels: BTreeMap<String, String>,
    /// Node Kubernetes version. The control plane version is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GCPManagedMachinePoolStatus {
    #[serde(default)]
    pub ready: bool,
    /// Most recently observed node count
    #[serde(default)]
    pub replicas: i32,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolAutoScaling {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_autoscaling: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_policy: Option<LocationPolicy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum LocationPolicy {
    Balanced,
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct Taint {
    pub effect: TaintEffect,
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum TaintEffect {
    NoSchedule,
    NoExecute,
    PreferNoSchedule,
}

impl GCPManagedMachinePool {
    /// GKE node pool name, falling back to the object name.
    #[must_use]
    pub fn node_pool_name(&self) -> String {
        match self.spec.node_pool_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.metadata.name.clone().unwrap_or_default(),
        }
    }
}

impl ConditionSetter for GCPManagedMachinePool {
    fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map_or(&[], |status| status.conditions.as_slice())
    }

    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.status.get_or_insert_with(Default::default).conditions
    }
}
