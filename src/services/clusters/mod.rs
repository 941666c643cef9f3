//! # Cluster Service
//!
//! Reconciles a `GCPManagedControlPlane` against its GKE cluster.
//!
//! ## Flow
//!
//! 1. Describe the cluster
//! 2. Absent: check machine pools and create it
//! 3. Transitional status: report it through conditions and requeue
//! 4. Running: apply the first drifted field, or publish the kubeconfig and
//!    mark the control plane ready

pub mod compare;
pub mod diff;
pub mod kubeconfig;
mod reconcile;

use std::fmt::Debug;
use std::sync::Arc;

use crate::container::ClusterClient;
use kubeconfig::KubeconfigWriter;

pub use diff::{pending_update, PendingUpdate};
pub use kubeconfig::{render_kubeconfig, KubeconfigSpec, SecretKubeconfigWriter};

/// Drives one control plane per call. Holds no per-object state.
#[derive(Clone)]
pub struct ClusterService {
    clusters: Arc<dyn ClusterClient>,
    kubeconfig: Arc<dyn KubeconfigWriter>,
}

impl Debug for ClusterService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterService").finish_non_exhaustive()
    }
}

impl ClusterService {
    #[must_use]
    pub fn new(clusters: Arc<dyn ClusterClient>, kubeconfig: Arc<dyn KubeconfigWriter>) -> Self {
        Self {
            clusters,
            kubeconfig,
        }
    }
}
