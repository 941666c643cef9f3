//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `gke_controller_reconciliations_total{kind}` - Total number of reconciliations
//! - `gke_controller_reconciliation_errors_total{kind}` - Total number of reconciliation errors
//! - `gke_controller_reconciliation_duration_seconds{kind}` - Duration of reconciliation passes
//! - `gke_controller_requeues_total{reason}` - Requeues by reason
//! - `gke_controller_cluster_updates_total{field}` - Single-field cluster updates submitted
//! - `gke_controller_gke_operations_total{operation}` - GKE Container API calls
//! - `gke_controller_gke_operation_duration_seconds{operation}` - Duration of GKE API calls
//! - `gke_controller_gke_operation_errors_total{operation}` - Failed GKE API calls

use anyhow::Result;
use prometheus::{HistogramVec, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "gke_controller_reconciliations_total",
            "Total number of reconciliations by resource kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "gke_controller_reconciliation_errors_total",
            "Total number of reconciliation errors by resource kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "gke_controller_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds by resource kind",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "gke_controller_requeues_total",
            "Total number of requeues by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static CLUSTER_UPDATES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "gke_controller_cluster_updates_total",
            "Total number of cluster updates submitted by field",
        ),
        &["field"],
    )
    .expect("Failed to create CLUSTER_UPDATES_TOTAL metric - this should never happen")
});

static GKE_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "gke_controller_gke_operations_total",
            "Total number of GKE Container API calls by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create GKE_OPERATIONS_TOTAL metric - this should never happen")
});

static GKE_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "gke_controller_gke_operation_duration_seconds",
            "Duration of GKE Container API calls in seconds by operation",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["operation"],
    )
    .expect("Failed to create GKE_OPERATION_DURATION metric - this should never happen")
});

pub(crate) static GKE_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "gke_controller_gke_operation_errors_total",
            "Total number of failed GKE Container API calls by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create GKE_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

/// Register all metrics with the shared registry.
///
/// Fails if called twice.
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CLUSTER_UPDATES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(GKE_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(GKE_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(GKE_OPERATION_ERRORS_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_reconciliations(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(kind: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

pub fn increment_requeues(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

/// Count a single-field cluster update
pub fn increment_cluster_updates(field: &str) {
    CLUSTER_UPDATES_TOTAL.with_label_values(&[field]).inc();
}

/// Record a completed GKE API call
pub fn record_gke_operation(operation: &str, duration: f64) {
    GKE_OPERATIONS_TOTAL.with_label_values(&[operation]).inc();
    GKE_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

/// Increment GKE operation errors counter
pub fn increment_gke_operation_errors(operation: &str) {
    GKE_OPERATION_ERRORS_TOTAL
        .with_label_values(&[operation])
        .inc();
}
