//! # GKE Cluster Controller
//!
//! Cluster API infrastructure provider for Google Kubernetes Engine.
//!
//! Watches `GCPManagedControlPlane` and `GCPManagedMachinePool` resources and
//! drives the matching GKE clusters and node pools toward the declared spec
//! through the GKE Container API.
//!
//! ## Endpoints
//!
//! - `/metrics` - Prometheus metrics
//! - `/healthz` - Liveness probe
//! - `/readyz` - Readiness probe

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use kube::Client;
use tracing::{error, info};

use gke_cluster_controller::config::ControllerConfig;
use gke_cluster_controller::constants::{
    DEFAULT_SERVER_POLL_INTERVAL_MS, DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
};
use gke_cluster_controller::container::ContainerREST;
use gke_cluster_controller::controller::{self, Context};
use gke_cluster_controller::observability;
use gke_cluster_controller::server::{start_server, wait_for_server_ready, ServerState};

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before any TLS connection is made.
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let config = ControllerConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("gke_cluster_controller={}", config.log_level.to_lowercase()).into()
            }),
        )
        .init();

    info!("Starting GKE Cluster Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_port = config.metrics_port;
    let server_state_clone = Arc::clone(&server_state);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(
        &server_state,
        &server_handle,
        Duration::from_secs(DEFAULT_SERVER_STARTUP_TIMEOUT_SECS),
        Duration::from_millis(DEFAULT_SERVER_POLL_INTERVAL_MS),
    )
    .await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let container = ContainerREST::new(
        config.container_api_endpoint.clone(),
        config.container_api_token.clone(),
    )
    .context("Failed to create GKE Container API client")?;

    let ctx = Arc::new(Context::new(client.clone(), config, Arc::new(container)));
    controller::run(client, ctx, server_state).await;

    Ok(())
}
