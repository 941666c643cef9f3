//! Node pool service passes against a recording GKE fake.

mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use common::{
    machine_pool, ready_control_plane, running_node_pool, Harness, NodePoolCall,
};
use gke_cluster_controller::container::model::{NodePoolStatus, StatusCondition};
use gke_cluster_controller::container::CloudError;
use gke_cluster_controller::crd::condition::{
    self, GKE_MACHINE_POOL_CREATING_CONDITION, GKE_MACHINE_POOL_DELETED_REASON,
    GKE_MACHINE_POOL_DELETING_CONDITION, GKE_MACHINE_POOL_DELETING_REASON,
    GKE_MACHINE_POOL_ERROR_REASON,
    GKE_MACHINE_POOL_READY_CONDITION, GKE_MACHINE_POOL_RECONCILIATION_FAILED_REASON,
    GKE_MACHINE_POOL_UPDATING_CONDITION, READY_CONDITION,
};
use gke_cluster_controller::crd::GCPManagedMachinePool;
use gke_cluster_controller::scope::ManagedMachinePoolScope;
use gke_cluster_controller::services::{ReconcileResult, ServiceError};

const POOL_FULL_NAME: &str =
    "projects/my-project/locations/europe-west2/clusters/default-capi-gke/nodePools/pool-0";

fn scope(harness: &Harness, machine_pool: GCPManagedMachinePool) -> ManagedMachinePoolScope {
    ManagedMachinePoolScope::new(
        machine_pool,
        ready_control_plane(),
        harness.machine_pool_patcher.clone(),
    )
}

#[tokio::test]
async fn test_resize_without_config_drift() {
    let harness = Harness::new(None, Some(running_node_pool("pool-0", 3)));
    let mut scope = scope(&harness, machine_pool("pool-0", 5));

    let result = harness.node_pool_service().reconcile(&mut scope).await.unwrap();

    assert_eq!(result, ReconcileResult::requeue_after(Duration::from_secs(30)));
    let calls = harness.node_pools.calls();
    assert_eq!(calls.len(), 1);
    let NodePoolCall::SetSize(request) = &calls[0] else {
        panic!("expected a resize, got {calls:?}");
    };
    assert_eq!(request.name, POOL_FULL_NAME);
    assert_eq!(request.node_count, 5);
    assert!(!calls.iter().any(|c| matches!(c, NodePoolCall::Update(_))));
    assert!(condition::is_true(
        &scope.machine_pool,
        GKE_MACHINE_POOL_UPDATING_CONDITION
    ));
}

#[tokio::test]
async fn test_label_drift_is_sent_as_update() {
    let harness = Harness::new(None, Some(running_node_pool("pool-0", 3)));
    let mut pool = machine_pool("pool-0", 5);
    pool.spec.kubernetes_labels = BTreeMap::from([("tier".to_string(), "batch".to_string())]);
    let mut scope = scope(&harness, pool);

    harness.node_pool_service().reconcile(&mut scope).await.unwrap();

    let calls = harness.node_pools.calls();
    assert_eq!(calls.len(), 1);
    let NodePoolCall::Update(request) = &calls[0] else {
        panic!("expected an update, got {calls:?}");
    };
    assert_eq!(
        request.labels.as_ref().map(|l| l.labels.clone()),
        Some(BTreeMap::from([("tier".to_string(), "batch".to_string())]))
    );
    assert!(request.taints.is_none());
}

#[tokio::test]
async fn test_converged_pool_is_ready() {
    let harness = Harness::new(None, Some(running_node_pool("pool-0", 3)));
    let mut scope = scope(&harness, machine_pool("pool-0", 3));

    let result = harness.node_pool_service().reconcile(&mut scope).await.unwrap();

    assert!(result.is_done());
    assert!(harness.node_pools.calls().is_empty());
    let status = scope.machine_pool.status.clone().unwrap();
    assert!(status.ready);
    assert_eq!(status.replicas, 3);
    assert!(condition::is_true(&scope.machine_pool, READY_CONDITION));
    assert!(condition::is_true(
        &scope.machine_pool,
        GKE_MACHINE_POOL_READY_CONDITION
    ));
}

#[tokio::test]
async fn test_absent_pool_is_created() {
    let harness = Harness::new(None, None);
    let mut scope = scope(&harness, machine_pool("pool-0", 2));

    let result = harness.node_pool_service().reconcile(&mut scope).await.unwrap();

    assert_eq!(result, ReconcileResult::requeue_after(Duration::from_secs(30)));
    let calls = harness.node_pools.calls();
    let [NodePoolCall::Create(request)] = calls.as_slice() else {
        panic!("expected one create, got {calls:?}");
    };
    assert_eq!(
        request.parent,
        "projects/my-project/locations/europe-west2/clusters/default-capi-gke"
    );
    assert_eq!(request.node_pool.name, "pool-0");
    assert_eq!(request.node_pool.initial_node_count, 2);
    assert!(condition::is_true(
        &scope.machine_pool,
        GKE_MACHINE_POOL_CREATING_CONDITION
    ));
    assert!(!scope.machine_pool.status.clone().unwrap().ready);
}

#[tokio::test]
async fn test_create_failure_is_recorded() {
    let harness = Harness::new(None, None);
    *harness.node_pools.mutate_error.lock().unwrap() = Some(CloudError::Api {
        code: 400,
        status: "INVALID_ARGUMENT".to_string(),
        message: "bad machine type".to_string(),
    });
    let mut scope = scope(&harness, machine_pool("pool-0", 2));

    let error = harness
        .node_pool_service()
        .reconcile(&mut scope)
        .await
        .unwrap_err();

    assert!(matches!(error, ServiceError::Cloud(_)));
    assert_eq!(
        condition::reason(&scope.machine_pool, GKE_MACHINE_POOL_CREATING_CONDITION),
        Some(GKE_MACHINE_POOL_RECONCILIATION_FAILED_REASON)
    );
}

#[tokio::test]
async fn test_error_pool_still_gets_resized() {
    let mut observed = running_node_pool("pool-0", 3);
    observed.status = NodePoolStatus::RunningWithError;
    observed.conditions = vec![StatusCondition {
        message: "instance group unhealthy".to_string(),
        ..StatusCondition::default()
    }];
    let harness = Harness::new(None, Some(observed));
    let mut scope = scope(&harness, machine_pool("pool-0", 4));

    harness.node_pool_service().reconcile(&mut scope).await.unwrap();

    assert!(matches!(
        harness.node_pools.calls().as_slice(),
        [NodePoolCall::SetSize(_)]
    ));
    let entry = condition::get(&scope.machine_pool, GKE_MACHINE_POOL_READY_CONDITION).unwrap();
    assert_eq!(entry.reason.as_deref(), Some(GKE_MACHINE_POOL_ERROR_REASON));
    assert_eq!(entry.message.as_deref(), Some("instance group unhealthy"));
}

#[tokio::test]
async fn test_provisioning_pool_requeues() {
    let mut observed = running_node_pool("pool-0", 3);
    observed.status = NodePoolStatus::Provisioning;
    let harness = Harness::new(None, Some(observed));
    let mut scope = scope(&harness, machine_pool("pool-0", 5));

    let result = harness.node_pool_service().reconcile(&mut scope).await.unwrap();

    assert_eq!(result, ReconcileResult::requeue_after(Duration::from_secs(30)));
    assert!(harness.node_pools.calls().is_empty());
    assert!(!scope.machine_pool.status.clone().unwrap().ready);
}

#[tokio::test]
async fn test_reconciling_pool_waits_without_changes() {
    let mut observed = running_node_pool("pool-0", 3);
    observed.status = NodePoolStatus::Reconciling;
    let harness = Harness::new(None, Some(observed));
    let mut scope = scope(&harness, machine_pool("pool-0", 5));

    let result = harness.node_pool_service().reconcile(&mut scope).await.unwrap();

    assert_eq!(result, ReconcileResult::requeue_after(Duration::from_secs(30)));
    assert!(harness.node_pools.calls().is_empty());
    assert!(condition::get(&scope.machine_pool, GKE_MACHINE_POOL_UPDATING_CONDITION).is_none());
    assert!(condition::get(&scope.machine_pool, READY_CONDITION).is_none());
}

#[tokio::test]
async fn test_stopping_pool_requeues_as_deleting() {
    let mut observed = running_node_pool("pool-0", 3);
    observed.status = NodePoolStatus::Stopping;
    let harness = Harness::new(None, Some(observed));
    let mut scope = scope(&harness, machine_pool("pool-0", 5));

    let result = harness.node_pool_service().reconcile(&mut scope).await.unwrap();

    assert_eq!(result, ReconcileResult::requeue_after(Duration::from_secs(30)));
    assert!(harness.node_pools.calls().is_empty());
    assert!(condition::is_true(
        &scope.machine_pool,
        GKE_MACHINE_POOL_DELETING_CONDITION
    ));
    assert_eq!(
        condition::reason(&scope.machine_pool, GKE_MACHINE_POOL_READY_CONDITION),
        Some(GKE_MACHINE_POOL_DELETING_REASON)
    );
    assert!(!scope.machine_pool.status.clone().unwrap().ready);
}

#[tokio::test]
async fn test_delete_waits_for_busy_pool() {
    for status in [NodePoolStatus::Provisioning, NodePoolStatus::Reconciling] {
        let mut observed = running_node_pool("pool-0", 3);
        observed.status = status;
        let harness = Harness::new(None, Some(observed));
        let mut scope = scope(&harness, machine_pool("pool-0", 3));

        let result = harness.node_pool_service().delete(&mut scope).await.unwrap();

        assert!(result.is_done());
        assert!(harness.node_pools.calls().is_empty());
        assert!(condition::get(&scope.machine_pool, GKE_MACHINE_POOL_DELETING_CONDITION).is_none());
    }
}

#[tokio::test]
async fn test_delete_of_stopping_pool_only_records_progress() {
    let mut observed = running_node_pool("pool-0", 3);
    observed.status = NodePoolStatus::Stopping;
    let harness = Harness::new(None, Some(observed));
    let mut scope = scope(&harness, machine_pool("pool-0", 3));

    let result = harness.node_pool_service().delete(&mut scope).await.unwrap();

    assert!(result.is_done());
    assert!(harness.node_pools.calls().is_empty());
    assert!(condition::is_true(
        &scope.machine_pool,
        GKE_MACHINE_POOL_DELETING_CONDITION
    ));
    assert_eq!(
        condition::reason(&scope.machine_pool, GKE_MACHINE_POOL_READY_CONDITION),
        Some(GKE_MACHINE_POOL_DELETING_REASON)
    );
}

#[tokio::test]
async fn test_delete_absent_pool_records_deleted() {
    let harness = Harness::new(None, None);
    let mut scope = scope(&harness, machine_pool("pool-0", 1));

    harness.node_pool_service().delete(&mut scope).await.unwrap();

    assert!(harness.node_pools.calls().is_empty());
    assert_eq!(
        condition::reason(&scope.machine_pool, GKE_MACHINE_POOL_DELETING_CONDITION),
        Some(GKE_MACHINE_POOL_DELETED_REASON)
    );
}

#[tokio::test]
async fn test_delete_running_pool() {
    let harness = Harness::new(None, Some(running_node_pool("pool-0", 3)));
    let mut scope = scope(&harness, machine_pool("pool-0", 3));

    harness.node_pool_service().delete(&mut scope).await.unwrap();

    assert_eq!(
        harness.node_pools.calls(),
        vec![NodePoolCall::Delete(POOL_FULL_NAME.to_string())]
    );
    assert!(condition::is_true(
        &scope.machine_pool,
        GKE_MACHINE_POOL_DELETING_CONDITION
    ));
}
