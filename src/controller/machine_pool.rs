//! # Machine Pool Reconciler
//!
//! Entry point the watch loop calls for every `GCPManagedMachinePool` event.
//! Node pools are only touched once the owning control plane reports ready.

use std::sync::Arc;
use std::time::Instant;

use kube::ResourceExt;
use kube_runtime::controller::Action;
use tracing::{info, info_span, Instrument};

use super::context::{Context, ReconcilerError};
use super::error_policy::resource_key;
use super::finalizer::{add_finalizer, is_paused, remove_finalizer};
use super::requeue_action;
use crate::constants::{CLUSTER_NAME_LABEL, DEFAULT_RETRY_TIME, MACHINE_POOL_FINALIZER};
use crate::crd::condition::{
    self, ConditionSeverity, GKE_MACHINE_POOL_DELETED_REASON, GKE_MACHINE_POOL_DELETING_CONDITION,
    GKE_MACHINE_POOL_READY_CONDITION, WAITING_FOR_GKE_CONTROL_PLANE_REASON,
};
use crate::crd::{GCPManagedControlPlane, GCPManagedMachinePool};
use crate::observability::metrics;
use crate::scope::ManagedMachinePoolScope;

const KIND: &str = "GCPManagedMachinePool";

/// Reconcile one machine pool.
///
/// # Errors
///
/// Returns service, scope and patch failures, and passes that exceed the
/// configured timeout.
pub async fn reconcile(
    machine_pool: Arc<GCPManagedMachinePool>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcilerError> {
    let name = machine_pool.name_any();
    let namespace = machine_pool.namespace().unwrap_or_default();
    let span = info_span!(
        "controller.reconcile",
        resource.kind = KIND,
        resource.name = %name,
        resource.namespace = %namespace,
    );

    async move {
        if is_paused(&machine_pool.metadata) {
            info!("Reconciliation is paused for this object");
            return Ok(Action::await_change());
        }

        metrics::increment_reconciliations(KIND);
        let start = Instant::now();
        let timeout = ctx.config.reconcile_timeout();

        let result = match tokio::time::timeout(timeout, reconcile_inner(&machine_pool, &ctx)).await {
            Ok(result) => result,
            Err(_) => Err(ReconcilerError::Timeout(format!("{namespace}/{name}"), timeout)),
        };
        metrics::observe_reconciliation_duration(KIND, start.elapsed().as_secs_f64());

        if result.is_ok() && ctx.backoff.reset(&resource_key(machine_pool.as_ref())) {
            info!("✅ Reconciliation succeeded, backoff reset");
        }
        result
    }
    .instrument(span)
    .await
}

async fn reconcile_inner(
    machine_pool: &GCPManagedMachinePool,
    ctx: &Context,
) -> Result<Action, ReconcilerError> {
    let mut machine_pool = machine_pool.clone();
    let deleting = machine_pool.metadata.deletion_timestamp.is_some();

    let Some(cluster_name) = machine_pool.labels().get(CLUSTER_NAME_LABEL).cloned() else {
        info!("Machine pool has no {} label yet", CLUSTER_NAME_LABEL);
        if deleting {
            remove_finalizer(
                ctx.machine_pool_patcher.as_ref(),
                &mut machine_pool,
                MACHINE_POOL_FINALIZER,
            )
            .await?;
        }
        return Ok(Action::await_change());
    };

    let namespace = machine_pool.namespace().unwrap_or_default();
    let Some(control_plane) = ctx
        .control_planes
        .find_control_plane(&namespace, &cluster_name)
        .await?
    else {
        info!(cluster = %cluster_name, "Control plane not found for machine pool");
        if deleting {
            // Without a control plane there is no GKE cluster left to hold the node pool.
            remove_finalizer(
                ctx.machine_pool_patcher.as_ref(),
                &mut machine_pool,
                MACHINE_POOL_FINALIZER,
            )
            .await?;
        }
        return Ok(Action::await_change());
    };

    if deleting {
        return reconcile_delete(machine_pool, control_plane, ctx).await;
    }

    add_finalizer(
        ctx.machine_pool_patcher.as_ref(),
        &mut machine_pool,
        MACHINE_POOL_FINALIZER,
    )
    .await?;

    let control_plane_ready = control_plane
        .status
        .as_ref()
        .is_some_and(|status| status.ready);
    let mut scope = ManagedMachinePoolScope::new(
        machine_pool,
        control_plane,
        Arc::clone(&ctx.machine_pool_patcher),
    );

    if !control_plane_ready {
        info!(cluster = %cluster_name, "Control plane is not ready yet");
        condition::mark_false(
            &mut scope.machine_pool,
            GKE_MACHINE_POOL_READY_CONDITION,
            WAITING_FOR_GKE_CONTROL_PLANE_REASON,
            ConditionSeverity::Info,
            "",
        );
        scope.close().await?;
        metrics::increment_requeues("waiting-for-control-plane");
        return Ok(Action::requeue(DEFAULT_RETRY_TIME));
    }

    let outcome = ctx.node_pools.reconcile(&mut scope).await;
    scope.close().await?;
    let outcome = outcome?;

    if !outcome.is_done() {
        return Ok(requeue_action(outcome, "not-converged"));
    }

    info!("✅ Reconciliation complete");
    metrics::increment_requeues("resync");
    Ok(Action::requeue(ctx.config.resync_interval()))
}

async fn reconcile_delete(
    machine_pool: GCPManagedMachinePool,
    control_plane: GCPManagedControlPlane,
    ctx: &Context,
) -> Result<Action, ReconcilerError> {
    let mut scope = ManagedMachinePoolScope::new(
        machine_pool,
        control_plane,
        Arc::clone(&ctx.machine_pool_patcher),
    );

    let outcome = ctx.node_pools.delete(&mut scope).await;
    let deleted = condition::reason(&scope.machine_pool, GKE_MACHINE_POOL_DELETING_CONDITION)
        == Some(GKE_MACHINE_POOL_DELETED_REASON);
    let mut machine_pool = scope.machine_pool.clone();
    scope.close().await?;
    outcome?;

    if deleted {
        remove_finalizer(
            ctx.machine_pool_patcher.as_ref(),
            &mut machine_pool,
            MACHINE_POOL_FINALIZER,
        )
        .await?;
        info!("✅ Machine pool deleted, finalizer removed");
        return Ok(Action::await_change());
    }

    metrics::increment_requeues("deleting");
    Ok(Action::requeue(ctx.config.deleting_requeue()))
}
