//! # Controller
//!
//! kube-runtime wiring for the two managed kinds.
//!
//! - `backoff`: Fibonacci backoff for failed passes
//! - `context`: shared state and the reconciler error type
//! - `error_policy`: requeue decision after a failed pass
//! - `finalizer`: finalizer and pause helpers
//! - `control_plane`: `GCPManagedControlPlane` reconciler
//! - `machine_pool`: `GCPManagedMachinePool` reconciler

pub mod backoff;
pub mod context;
pub mod control_plane;
pub mod error_policy;
pub mod finalizer;
pub mod machine_pool;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::StreamExt;
use kube::{Api, Client};
use kube_runtime::controller::Action;
use kube_runtime::{watcher, Controller};
use tracing::{debug, info, warn};

pub use context::{Context, ReconcilerError};
pub use error_policy::error_policy;

use crate::constants::DEFAULT_RETRY_TIME;
use crate::crd::{GCPManagedControlPlane, GCPManagedMachinePool};
use crate::observability::metrics;
use crate::server::ServerState;
use crate::services::ReconcileResult;

/// Requeue for a pass that is still waiting on GKE.
pub(crate) fn requeue_action(result: ReconcileResult, reason: &str) -> Action {
    metrics::increment_requeues(reason);
    Action::requeue(result.requeue_after.unwrap_or(DEFAULT_RETRY_TIME))
}

fn api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    <K as kube::Resource>::DynamicType: Default,
{
    match namespace {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    }
}

/// Run both controllers until a shutdown signal arrives.
pub async fn run(client: Client, ctx: Arc<Context>, server_state: Arc<ServerState>) {
    let namespace = ctx.config.namespace().map(ToString::to_string);
    match namespace.as_deref() {
        Some(ns) => info!("Watching namespace {}", ns),
        None => info!("Watching all namespaces"),
    }

    let control_planes = Controller::new(
        api::<GCPManagedControlPlane>(&client, namespace.as_deref()),
        watcher::Config::default().any_semantic(),
    )
    .shutdown_on_signal()
    .run(
        control_plane::reconcile,
        error_policy::<GCPManagedControlPlane>,
        Arc::clone(&ctx),
    )
    .for_each(|result| async move {
        match result {
            Ok((object, _)) => debug!(resource.name = %object.name, "watch.event.success"),
            Err(e) => warn!("GCPManagedControlPlane controller error: {}", e),
        }
    });

    let machine_pools = Controller::new(
        api::<GCPManagedMachinePool>(&client, namespace.as_deref()),
        watcher::Config::default().any_semantic(),
    )
    .shutdown_on_signal()
    .run(
        machine_pool::reconcile,
        error_policy::<GCPManagedMachinePool>,
        ctx,
    )
    .for_each(|result| async move {
        match result {
            Ok((object, _)) => debug!(resource.name = %object.name, "watch.event.success"),
            Err(e) => warn!("GCPManagedMachinePool controller error: {}", e),
        }
    });

    info!("Starting controller watch loops...");
    futures::join!(control_planes, machine_pools);

    server_state.is_ready.store(false, Ordering::Relaxed);
    info!("Controller stopped gracefully");
}
