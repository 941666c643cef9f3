//! # Node Pool Service
//!
//! Reconciles a `GCPManagedMachinePool` against its GKE node pool. Error
//! states of a pool are reported but do not stop drift correction.

pub mod diff;
mod reconcile;

use std::fmt::Debug;
use std::sync::Arc;

use crate::container::NodePoolClient;

pub use diff::{pending_change, NodePoolChange};

#[derive(Clone)]
pub struct NodePoolService {
    node_pools: Arc<dyn NodePoolClient>,
}

impl Debug for NodePoolService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodePoolService").finish_non_exhaustive()
    }
}

impl NodePoolService {
    #[must_use]
    pub fn new(node_pools: Arc<dyn NodePoolClient>) -> Self {
        Self { node_pools }
    }
}
