//! # Error Policy
//!
//! Requeue decision for failed reconcile passes. Backoff grows per resource
//! so one failing object does not slow the others down.

use std::sync::Arc;

use kube::Resource;
use kube_runtime::controller::Action;
use tracing::{error, info};

use super::context::{Context, ReconcilerError};
use crate::observability::metrics;

/// Key used for per-resource backoff state.
pub fn resource_key<K>(obj: &K) -> String
where
    K: Resource<DynamicType = ()>,
{
    format!(
        "{}/{}/{}",
        K::kind(&()),
        obj.meta().namespace.as_deref().unwrap_or("default"),
        obj.meta().name.as_deref().unwrap_or("unknown"),
    )
}

/// Handle reconciliation errors with Fibonacci backoff.
pub fn error_policy<K>(obj: Arc<K>, error: &ReconcilerError, ctx: Arc<Context>) -> Action
where
    K: Resource<DynamicType = ()>,
{
    let kind = K::kind(&());
    let name = obj.meta().name.as_deref().unwrap_or("unknown");
    let namespace = obj.meta().namespace.as_deref().unwrap_or("default");

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.reconciliation_error",
        resource.kind = %kind,
        resource.name = name,
        resource.namespace = namespace,
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}/{}: {}", namespace, name, error);
    metrics::increment_reconciliation_errors(&kind);

    let (backoff, error_count) = ctx.backoff.record_failure(&resource_key(obj.as_ref()));
    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::from_std(backoff).unwrap_or_else(|_| chrono::Duration::zero());

    info!(
        "🔄 Retrying with Fibonacci backoff: {}s (error count: {}, trigger source: error-backoff)",
        backoff.as_secs(),
        error_count
    );
    info!(
        "📅 Next retry scheduled: {} (in {}s)",
        next_trigger_time.to_rfc3339(),
        backoff.as_secs()
    );

    metrics::increment_requeues("error-backoff");
    Action::requeue(backoff)
}
