//! # Custom Resource Definitions
//!
//! CRD types for the GKE Cluster API controller.
//!
//! ## Module Structure
//!
//! - `control_plane.rs` - `GCPManagedControlPlane`, one GKE cluster
//! - `machine_pool.rs` - `GCPManagedMachinePool`, one GKE node pool
//! - `condition.rs` - Cluster API style status conditions
//! - `defaults.rs` - Defaulting of unset fields
//! - `validation.rs` - Field validation and node pool preflight checks
//! - `convert.rs` - Mapping from CRD fields to GKE API types

pub mod condition;
pub mod control_plane;
pub mod convert;
pub mod defaults;
pub mod machine_pool;
pub mod validation;

// Re-export the resource types
pub use condition::{Condition, ConditionSetter, ConditionSeverity};
pub use control_plane::{
    GCPManagedControlPlane, GCPManagedControlPlaneSpec, GCPManagedControlPlaneStatus,
};
pub use machine_pool::{
    GCPManagedMachinePool, GCPManagedMachinePoolSpec, GCPManagedMachinePoolStatus,
};
