//! # Reconciler Services
//!
//! The GKE reconciliation core. Each service drives one managed object
//! toward its desired state through at most one mutating GKE call per pass
//! and reports progress through the object's conditions.
//!
//! - `clusters`: `GCPManagedControlPlane` against a GKE cluster
//! - `nodepools`: `GCPManagedMachinePool` against a GKE node pool

pub mod clusters;
pub mod nodepools;

use std::time::Duration;

use thiserror::Error;

use crate::container::CloudError;
use crate::crd::convert::ConversionError;
use crate::scope::ScopeError;

/// Outcome of a successful pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    pub requeue: bool,
    pub requeue_after: Option<Duration>,
}

impl ReconcileResult {
    /// Converged; nothing left to do until the next change.
    #[must_use]
    pub fn done() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn requeue_after(after: Duration) -> Self {
        Self {
            requeue: true,
            requeue_after: Some(after),
        }
    }

    /// Requeue without a fixed delay.
    #[must_use]
    pub fn requeue() -> Self {
        Self {
            requeue: true,
            requeue_after: None,
        }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        !self.requeue && self.requeue_after.is_none()
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("cannot create autopilot cluster with explicit machine pools")]
    AutopilotClusterMachinePoolsNotAllowed,
    #[error("unexpected cluster status {0}")]
    UnexpectedClusterStatus(String),
    #[error("invalid spec: {0}")]
    InvalidSpec(String),
    #[error("GKE API error: {0}")]
    Cloud(#[from] CloudError),
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    #[error("conversion failed: {0}")]
    Conversion(String),
    #[error(transparent)]
    Scope(#[from] ScopeError),
}

impl From<ConversionError> for ServiceError {
    fn from(error: ConversionError) -> Self {
        Self::Conversion(error.to_string())
    }
}
