//! # CRD Generator
//!
//! Prints the CustomResourceDefinitions of both managed kinds as YAML.
//!
//! ## Usage
//!
//! ```bash
//! # Both CRDs as one multi-document stream
//! cargo run --bin crdgen > config/crd/gke.yaml
//!
//! # One kind only
//! cargo run --bin crdgen -- --kind control-plane | kubectl apply -f -
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::core::CustomResourceExt;

use gke_cluster_controller::crd::{GCPManagedControlPlane, GCPManagedMachinePool};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    ControlPlane,
    MachinePool,
    All,
}

/// Generate GKE Cluster API CRD manifests
#[derive(Debug, Parser)]
#[command(name = "crdgen", about = "Generate GKE Cluster API CRD manifests", long_about = None)]
struct Cli {
    /// Which CRD to print
    #[arg(long, value_enum, default_value_t = Kind::All)]
    kind: Kind,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let crds: Vec<CustomResourceDefinition> = match cli.kind {
        Kind::ControlPlane => vec![GCPManagedControlPlane::crd()],
        Kind::MachinePool => vec![GCPManagedMachinePool::crd()],
        Kind::All => vec![GCPManagedControlPlane::crd(), GCPManagedMachinePool::crd()],
    };

    println!("# This file is auto-generated by crdgen");
    println!("# DO NOT EDIT THIS FILE MANUALLY");
    for crd in &crds {
        let yaml = serde_yaml::to_string(crd).context("Failed to serialize CRD to YAML")?;
        println!("---");
        print!("{yaml}");
    }
    Ok(())
}
