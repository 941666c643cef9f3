//! # Control Plane Reconciler
//!
//! Entry point the watch loop calls for every `GCPManagedControlPlane` event.
//!
//! One pass: skip paused objects, persist defaults, ensure the finalizer,
//! then hand the object to the cluster service inside a scope. Deletion
//! waits until every machine pool of the cluster is gone before the GKE
//! cluster itself is removed.

use std::sync::Arc;
use std::time::Instant;

use kube::ResourceExt;
use kube_runtime::controller::Action;
use serde_json::json;
use tracing::{info, info_span, Instrument};

use super::context::{Context, ReconcilerError};
use super::error_policy::resource_key;
use super::finalizer::{add_finalizer, is_paused, remove_finalizer};
use super::requeue_action;
use crate::constants::CONTROL_PLANE_FINALIZER;
use crate::crd::condition::{
    self, GKE_CONTROL_PLANE_CREATING_CONDITION, GKE_CONTROL_PLANE_DELETED_REASON,
    GKE_CONTROL_PLANE_DELETING_CONDITION,
};
use crate::crd::defaults::default_control_plane;
use crate::crd::GCPManagedControlPlane;
use crate::observability::metrics;
use crate::scope::{ManagedControlPlaneScope, ScopeError};

const KIND: &str = "GCPManagedControlPlane";

/// Reconcile one control plane.
///
/// # Errors
///
/// Returns service, scope and patch failures, and passes that exceed the
/// configured timeout. The error policy turns these into backoff requeues.
pub async fn reconcile(
    control_plane: Arc<GCPManagedControlPlane>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcilerError> {
    let name = control_plane.name_any();
    let namespace = control_plane.namespace().unwrap_or_default();
    let span = info_span!(
        "controller.reconcile",
        resource.kind = KIND,
        resource.name = %name,
        resource.namespace = %namespace,
    );

    async move {
        if is_paused(&control_plane.metadata) {
            info!("Reconciliation is paused for this object");
            return Ok(Action::await_change());
        }

        metrics::increment_reconciliations(KIND);
        let start = Instant::now();
        let timeout = ctx.config.reconcile_timeout();

        let result = match tokio::time::timeout(timeout, reconcile_inner(&control_plane, &ctx)).await {
            Ok(result) => result,
            Err(_) => Err(ReconcilerError::Timeout(format!("{namespace}/{name}"), timeout)),
        };
        metrics::observe_reconciliation_duration(KIND, start.elapsed().as_secs_f64());

        if result.is_ok() && ctx.backoff.reset(&resource_key(control_plane.as_ref())) {
            info!("✅ Reconciliation succeeded, backoff reset");
        }
        result
    }
    .instrument(span)
    .await
}

async fn reconcile_inner(
    control_plane: &GCPManagedControlPlane,
    ctx: &Context,
) -> Result<Action, ReconcilerError> {
    let mut control_plane = control_plane.clone();

    if control_plane.metadata.deletion_timestamp.is_some() {
        return reconcile_delete(control_plane, ctx).await;
    }

    add_finalizer(
        ctx.control_plane_patcher.as_ref(),
        &mut control_plane,
        CONTROL_PLANE_FINALIZER,
    )
    .await?;

    if default_control_plane(&mut control_plane) {
        info!(cluster = %control_plane.spec.cluster_name, "Persisting defaulted fields");
        let mut spec = json!({ "clusterName": control_plane.spec.cluster_name });
        if let Some(logging) = &control_plane.spec.logging_config {
            spec["loggingConfig"] = json!(logging);
        }
        ctx.control_plane_patcher
            .patch_spec(&control_plane, spec)
            .await?;
    }

    let mut scope = ManagedControlPlaneScope::new(
        control_plane,
        Arc::clone(&ctx.lister),
        Arc::clone(&ctx.control_plane_patcher),
    );
    let outcome = ctx.clusters.reconcile(&mut scope).await;
    let creating = condition::is_true(&scope.control_plane, GKE_CONTROL_PLANE_CREATING_CONDITION);
    // Conditions recorded on failure must still reach the API server.
    scope.close().await?;
    let outcome = outcome?;

    if !outcome.is_done() {
        return Ok(requeue_action(outcome, "not-converged"));
    }
    if creating {
        info!("Waiting for control plane creation to finish");
        metrics::increment_requeues("creating");
        return Ok(Action::requeue(ctx.config.creating_requeue()));
    }

    info!("✅ Reconciliation complete");
    metrics::increment_requeues("resync");
    Ok(Action::requeue(ctx.config.resync_interval()))
}

async fn reconcile_delete(
    control_plane: GCPManagedControlPlane,
    ctx: &Context,
) -> Result<Action, ReconcilerError> {
    let mut scope = ManagedControlPlaneScope::new(
        control_plane,
        Arc::clone(&ctx.lister),
        Arc::clone(&ctx.control_plane_patcher),
    );

    let pools = match scope.owned_machine_pools().await {
        Ok(pools) => pools,
        Err(ScopeError::MissingClusterLabel { .. }) => Vec::new(),
        Err(e) => return Err(e.into()),
    };
    if !pools.is_empty() {
        info!(
            machine_pools = pools.len(),
            "Waiting for machine pools to be deleted before the cluster"
        );
        metrics::increment_requeues("deleting");
        return Ok(Action::requeue(ctx.config.deleting_requeue()));
    }

    let outcome = ctx.clusters.delete(&mut scope).await;
    let deleted = condition::reason(&scope.control_plane, GKE_CONTROL_PLANE_DELETING_CONDITION)
        == Some(GKE_CONTROL_PLANE_DELETED_REASON);
    let mut control_plane = scope.control_plane.clone();
    scope.close().await?;
    outcome?;

    if deleted {
        remove_finalizer(
            ctx.control_plane_patcher.as_ref(),
            &mut control_plane,
            CONTROL_PLANE_FINALIZER,
        )
        .await?;
        info!("✅ Control plane deleted, finalizer removed");
        return Ok(Action::await_change());
    }

    metrics::increment_requeues("deleting");
    Ok(Action::requeue(ctx.config.deleting_requeue()))
}
