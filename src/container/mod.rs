//! # GKE Container API
//!
//! Model types, the narrow client traits the reconcilers depend on, and the
//! REST implementation of those traits.

pub mod client;
pub mod model;
pub mod rest;

pub use client::{CloudError, ClusterClient, NodePoolClient};
pub use rest::ContainerREST;
