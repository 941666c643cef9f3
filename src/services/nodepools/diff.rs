//! Drift detection for a node pool.

use crate::container::model::{
    NodeLabels, NodePool, NodeTaints, SetNodePoolSizeRequest, UpdateNodePoolRequest,
};
use crate::crd::convert;
use crate::crd::machine_pool::GCPManagedMachinePoolSpec;

/// The single call needed to move a node pool toward its spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodePoolChange {
    /// Version, labels and taints travel together in one request.
    Update(UpdateNodePoolRequest),
    Resize(SetNodePoolSizeRequest),
}

impl NodePoolChange {
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::Update(_) => "node_pool_config",
            Self::Resize(_) => "node_pool_size",
        }
    }
}

/// Config changes win over size changes; size is only looked at once the
/// pool config matches.
#[must_use]
pub fn pending_change(
    spec: &GCPManagedMachinePoolSpec,
    observed: &NodePool,
    full_name: &str,
) -> Option<NodePoolChange> {
    let mut request = UpdateNodePoolRequest {
        name: full_name.to_string(),
        ..UpdateNodePoolRequest::default()
    };
    let mut needs_update = false;

    if let Some(version) = &spec.node_version {
        if *version != observed.version {
            request.node_version = Some(version.clone());
            needs_update = true;
        }
    }

    let observed_config = observed.config.clone().unwrap_or_default();
    if spec.kubernetes_labels != observed_config.labels {
        request.labels = Some(NodeLabels {
            labels: spec.kubernetes_labels.clone(),
        });
        needs_update = true;
    }

    let desired_taints = convert::taints(&spec.kubernetes_taints);
    if desired_taints != observed_config.taints {
        request.taints = Some(NodeTaints {
            taints: desired_taints,
        });
        needs_update = true;
    }

    if needs_update {
        return Some(NodePoolChange::Update(request));
    }

    (spec.node_count != observed.initial_node_count).then(|| {
        NodePoolChange::Resize(SetNodePoolSizeRequest {
            name: full_name.to_string(),
            node_count: spec.node_count,
        })
    })
}
