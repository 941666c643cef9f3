//! Node pool reconcile and delete passes.

use tracing::{debug, error, info};

use super::diff::{pending_change, NodePoolChange};
use super::NodePoolService;
use crate::constants::DEFAULT_RETRY_TIME;
use crate::container::model::{CreateNodePoolRequest, NodePool, NodePoolStatus};
use crate::container::CloudError;
use crate::crd::condition::{
    self, ConditionSeverity, GKE_MACHINE_POOL_CREATED_REASON, GKE_MACHINE_POOL_CREATING_CONDITION,
    GKE_MACHINE_POOL_CREATING_REASON, GKE_MACHINE_POOL_DELETED_REASON,
    GKE_MACHINE_POOL_DELETING_CONDITION, GKE_MACHINE_POOL_DELETING_REASON,
    GKE_MACHINE_POOL_ERROR_REASON, GKE_MACHINE_POOL_READY_CONDITION,
    GKE_MACHINE_POOL_RECONCILIATION_FAILED_REASON, GKE_MACHINE_POOL_UPDATED_REASON,
    GKE_MACHINE_POOL_UPDATING_CONDITION, READY_CONDITION,
};
use crate::crd::convert;
use crate::observability::metrics;
use crate::scope::ManagedMachinePoolScope;
use crate::services::{ReconcileResult, ServiceError};

impl NodePoolService {
    /// Move the node pool one step toward the machine pool spec.
    ///
    /// # Errors
    ///
    /// Returns GKE failures after recording them in the conditions.
    pub async fn reconcile(
        &self,
        scope: &mut ManagedMachinePoolScope,
    ) -> Result<ReconcileResult, ServiceError> {
        info!(node_pool = %scope.node_pool_name(), "Reconciling node pool resources");

        // Optimistic; every non-converged branch below clears it.
        scope.status_mut().ready = true;

        let node_pool = match self.describe(scope).await {
            Ok(node_pool) => node_pool,
            Err(e) => {
                scope.status_mut().ready = false;
                return Err(e.into());
            }
        };

        let Some(node_pool) = node_pool else {
            info!(node_pool = %scope.node_pool_name(), "Node pool not found, creating");
            scope.status_mut().ready = false;
            if let Err(e) = self.create_node_pool(scope).await {
                mark_all_false(
                    scope,
                    &[GKE_MACHINE_POOL_READY_CONDITION, GKE_MACHINE_POOL_CREATING_CONDITION],
                    GKE_MACHINE_POOL_RECONCILIATION_FAILED_REASON,
                    ConditionSeverity::Error,
                    &e.to_string(),
                );
                return Err(e.into());
            }
            info!(node_pool = %scope.node_pool_name(), "Node pool provisioning in progress");
            mark_creating(scope);
            return Ok(ReconcileResult::requeue_after(DEFAULT_RETRY_TIME));
        };

        match &node_pool.status {
            NodePoolStatus::Provisioning => {
                info!(node_pool = %scope.node_pool_name(), "Node pool provisioning in progress");
                mark_creating(scope);
                scope.status_mut().ready = false;
                return Ok(ReconcileResult::requeue_after(DEFAULT_RETRY_TIME));
            }
            NodePoolStatus::Reconciling => {
                info!(node_pool = %scope.node_pool_name(), "Node pool reconciling in progress");
                return Ok(ReconcileResult::requeue_after(DEFAULT_RETRY_TIME));
            }
            NodePoolStatus::Stopping => {
                info!(node_pool = %scope.node_pool_name(), "Node pool stopping in progress");
                mark_deleting(scope);
                scope.status_mut().ready = false;
                return Ok(ReconcileResult::requeue_after(DEFAULT_RETRY_TIME));
            }
            NodePoolStatus::Error | NodePoolStatus::RunningWithError => {
                let message = node_pool
                    .conditions
                    .first()
                    .map(|c| c.message.clone())
                    .unwrap_or_default();
                error!(
                    node_pool = %scope.node_pool_name(),
                    status = %node_pool.status,
                    "Node pool in error/degraded state: {}",
                    message
                );
                mark_all_false(
                    scope,
                    &[GKE_MACHINE_POOL_READY_CONDITION, READY_CONDITION],
                    GKE_MACHINE_POOL_ERROR_REASON,
                    ConditionSeverity::Error,
                    &message,
                );
            }
            other => {
                debug!(node_pool = %scope.node_pool_name(), status = %other, "Node pool found");
            }
        }

        if let Some(change) = pending_change(
            &scope.machine_pool.spec,
            &node_pool,
            &scope.node_pool_full_name(),
        ) {
            let field = change.field();
            info!(node_pool = %scope.node_pool_name(), field, "Node pool update required");
            self.apply_change(change).await.map_err(|e| {
                error!(node_pool = %scope.node_pool_name(), error = %e, "Error updating GKE node pool");
                e
            })?;
            metrics::increment_cluster_updates(field);
            info!(node_pool = %scope.node_pool_name(), field, "Node pool update in progress");
            condition::mark_true(&mut scope.machine_pool, GKE_MACHINE_POOL_UPDATING_CONDITION);
            return Ok(ReconcileResult::requeue_after(DEFAULT_RETRY_TIME));
        }

        scope.set_replicas(node_pool.initial_node_count);
        condition::mark_true(&mut scope.machine_pool, READY_CONDITION);
        condition::mark_true(&mut scope.machine_pool, GKE_MACHINE_POOL_READY_CONDITION);
        condition::mark_false(
            &mut scope.machine_pool,
            GKE_MACHINE_POOL_CREATING_CONDITION,
            GKE_MACHINE_POOL_CREATED_REASON,
            ConditionSeverity::Info,
            "",
        );
        condition::mark_false(
            &mut scope.machine_pool,
            GKE_MACHINE_POOL_UPDATING_CONDITION,
            GKE_MACHINE_POOL_UPDATED_REASON,
            ConditionSeverity::Info,
            "",
        );
        info!(node_pool = %scope.node_pool_name(), "✅ Node pool reconciled");
        Ok(ReconcileResult::done())
    }

    /// Start deleting the node pool, or record that it is gone.
    ///
    /// # Errors
    ///
    /// Returns describe and delete failures.
    pub async fn delete(
        &self,
        scope: &mut ManagedMachinePoolScope,
    ) -> Result<ReconcileResult, ServiceError> {
        info!(node_pool = %scope.node_pool_name(), "Deleting node pool resources");

        let Some(node_pool) = self.describe(scope).await? else {
            info!(node_pool = %scope.node_pool_name(), "Node pool already deleted");
            condition::mark_false(
                &mut scope.machine_pool,
                GKE_MACHINE_POOL_DELETING_CONDITION,
                GKE_MACHINE_POOL_DELETED_REASON,
                ConditionSeverity::Info,
                "",
            );
            return Ok(ReconcileResult::done());
        };

        match node_pool.status {
            NodePoolStatus::Provisioning | NodePoolStatus::Reconciling => {
                info!(
                    node_pool = %scope.node_pool_name(),
                    status = %node_pool.status,
                    "Node pool busy, waiting before delete"
                );
                return Ok(ReconcileResult::done());
            }
            NodePoolStatus::Stopping => {
                info!(node_pool = %scope.node_pool_name(), "Node pool stopping in progress");
                mark_deleting(scope);
                return Ok(ReconcileResult::done());
            }
            _ => {}
        }

        if let Err(e) = self
            .node_pools
            .delete_node_pool(&scope.node_pool_full_name())
            .await
        {
            error!(node_pool = %scope.node_pool_name(), error = %e, "Error deleting GKE node pool");
            condition::mark_false(
                &mut scope.machine_pool,
                GKE_MACHINE_POOL_DELETING_CONDITION,
                GKE_MACHINE_POOL_RECONCILIATION_FAILED_REASON,
                ConditionSeverity::Error,
                &e.to_string(),
            );
            return Err(e.into());
        }

        info!(node_pool = %scope.node_pool_name(), "Node pool deleting in progress");
        scope.status_mut().ready = false;
        mark_deleting(scope);
        Ok(ReconcileResult::done())
    }

    async fn describe(
        &self,
        scope: &ManagedMachinePoolScope,
    ) -> Result<Option<NodePool>, CloudError> {
        match self.node_pools.get_node_pool(&scope.node_pool_full_name()).await {
            Ok(node_pool) => Ok(Some(node_pool)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => {
                error!(node_pool = %scope.node_pool_name(), error = %e, "Error getting GKE node pool");
                Err(e)
            }
        }
    }

    async fn create_node_pool(&self, scope: &ManagedMachinePoolScope) -> Result<(), CloudError> {
        let request = CreateNodePoolRequest {
            parent: scope.node_pool_location(),
            node_pool: convert::node_pool(&scope.machine_pool),
        };
        self.node_pools
            .create_node_pool(request)
            .await
            .map_err(|e| {
                error!(node_pool = %scope.node_pool_name(), error = %e, "Error creating GKE node pool");
                e
            })?;
        Ok(())
    }

    async fn apply_change(&self, change: NodePoolChange) -> Result<(), CloudError> {
        match change {
            NodePoolChange::Update(request) => {
                self.node_pools.update_node_pool(request).await?;
            }
            NodePoolChange::Resize(request) => {
                self.node_pools.set_node_pool_size(request).await?;
            }
        }
        Ok(())
    }
}

fn mark_creating(scope: &mut ManagedMachinePoolScope) {
    condition::mark_false(
        &mut scope.machine_pool,
        GKE_MACHINE_POOL_READY_CONDITION,
        GKE_MACHINE_POOL_CREATING_REASON,
        ConditionSeverity::Info,
        "",
    );
    condition::mark_true(&mut scope.machine_pool, GKE_MACHINE_POOL_CREATING_CONDITION);
}

fn mark_deleting(scope: &mut ManagedMachinePoolScope) {
    condition::mark_false(
        &mut scope.machine_pool,
        GKE_MACHINE_POOL_READY_CONDITION,
        GKE_MACHINE_POOL_DELETING_REASON,
        ConditionSeverity::Info,
        "",
    );
    condition::mark_true(&mut scope.machine_pool, GKE_MACHINE_POOL_DELETING_CONDITION);
}

fn mark_all_false(
    scope: &mut ManagedMachinePoolScope,
    condition_types: &[&str],
    reason: &str,
    severity: ConditionSeverity,
    message: &str,
) {
    for condition_type in condition_types {
        condition::mark_false(&mut scope.machine_pool, condition_type, reason, severity, message);
    }
}
