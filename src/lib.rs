//! GKE Cluster Controller Library
//!
//! Cluster API resources for GKE, the Container API client, and the
//! reconcilers that bind them. The binary in `main.rs` only wires these
//! together.

pub mod config;
pub mod constants;
pub mod container;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod scope;
pub mod server;
pub mod services;
