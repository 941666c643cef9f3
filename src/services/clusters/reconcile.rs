//! Cluster reconcile and delete passes.

use tracing::{debug, error, info, warn};

use super::diff::{pending_update, PendingUpdate};
use super::kubeconfig::{render_kubeconfig, KubeconfigSpec};
use super::ClusterService;
use crate::constants::DEFAULT_RETRY_TIME;
use crate::container::model::{Autopilot, Cluster, ClusterStatus, CreateClusterRequest, MaxPodsConstraint, ReleaseChannel};
use crate::container::CloudError;
use crate::crd::condition::{
    self, ConditionSeverity, GKE_CONTROL_PLANE_CREATED_REASON, GKE_CONTROL_PLANE_CREATING_CONDITION,
    GKE_CONTROL_PLANE_CREATING_REASON, GKE_CONTROL_PLANE_DELETED_REASON,
    GKE_CONTROL_PLANE_DELETING_CONDITION, GKE_CONTROL_PLANE_DELETING_REASON,
    GKE_CONTROL_PLANE_ERROR_REASON, GKE_CONTROL_PLANE_READY_CONDITION,
    GKE_CONTROL_PLANE_RECONCILIATION_FAILED_REASON,
    GKE_CONTROL_PLANE_REQUIRES_AT_LEAST_ONE_NODE_POOL_REASON, GKE_CONTROL_PLANE_UPDATED_REASON,
    GKE_CONTROL_PLANE_UPDATING_CONDITION, READY_CONDITION,
};
use crate::crd::validation::{machine_pools_preflight, summarize, validate_control_plane};
use crate::crd::{convert, GCPManagedMachinePool};
use crate::observability::metrics;
use crate::scope::ManagedControlPlaneScope;
use crate::services::{ReconcileResult, ServiceError};

/// Conditions that describe whether a cluster exists yet.
const CREATE_CONDITIONS: [&str; 3] = [
    READY_CONDITION,
    GKE_CONTROL_PLANE_READY_CONDITION,
    GKE_CONTROL_PLANE_CREATING_CONDITION,
];

impl ClusterService {
    /// Move the GKE cluster one step toward the control plane spec.
    ///
    /// # Errors
    ///
    /// Returns GKE and Kubernetes failures, an unknown cluster status, and
    /// spec problems found before create. Conditions are updated first.
    pub async fn reconcile(
        &self,
        scope: &mut ManagedControlPlaneScope,
    ) -> Result<ReconcileResult, ServiceError> {
        info!(cluster = %scope.cluster_name(), "Reconciling cluster resources");

        let cluster = match self.describe(scope).await {
            Ok(cluster) => cluster,
            Err(e) => {
                set_readiness(scope, false, false);
                condition::mark_false(
                    &mut scope.control_plane,
                    READY_CONDITION,
                    GKE_CONTROL_PLANE_RECONCILIATION_FAILED_REASON,
                    ConditionSeverity::Error,
                    &e.to_string(),
                );
                return Err(e.into());
            }
        };

        let Some(cluster) = cluster else {
            info!(cluster = %scope.cluster_name(), "Cluster not found, creating");
            set_readiness(scope, false, false);
            return self.reconcile_absent(scope).await;
        };

        debug!(cluster = %scope.cluster_name(), status = %cluster.status, "GKE cluster found");
        scope
            .status_mut()
            .current_version
            .clone_from(&cluster.current_master_version);

        match &cluster.status {
            ClusterStatus::Provisioning => {
                info!(cluster = %scope.cluster_name(), "Cluster provisioning in progress");
                mark_all_false(
                    scope,
                    &[READY_CONDITION, GKE_CONTROL_PLANE_READY_CONDITION],
                    GKE_CONTROL_PLANE_CREATING_REASON,
                    ConditionSeverity::Info,
                    "",
                );
                condition::mark_true(&mut scope.control_plane, GKE_CONTROL_PLANE_CREATING_CONDITION);
                set_readiness(scope, false, false);
                return Ok(ReconcileResult::requeue_after(DEFAULT_RETRY_TIME));
            }
            ClusterStatus::Reconciling => {
                info!(cluster = %scope.cluster_name(), "Cluster reconciling in progress");
                condition::mark_true(&mut scope.control_plane, GKE_CONTROL_PLANE_UPDATING_CONDITION);
                set_readiness(scope, true, true);
                return Ok(ReconcileResult::requeue_after(DEFAULT_RETRY_TIME));
            }
            ClusterStatus::Stopping => {
                info!(cluster = %scope.cluster_name(), "Cluster stopping in progress");
                mark_all_false(
                    scope,
                    &[READY_CONDITION, GKE_CONTROL_PLANE_READY_CONDITION],
                    GKE_CONTROL_PLANE_DELETING_REASON,
                    ConditionSeverity::Info,
                    "",
                );
                condition::mark_true(&mut scope.control_plane, GKE_CONTROL_PLANE_DELETING_CONDITION);
                set_readiness(scope, false, false);
                return Ok(ReconcileResult::requeue_after(DEFAULT_RETRY_TIME));
            }
            ClusterStatus::Error | ClusterStatus::Degraded => {
                let message = cluster
                    .conditions
                    .first()
                    .map(|c| c.message.clone())
                    .unwrap_or_default();
                error!(
                    cluster = %scope.cluster_name(),
                    status = %cluster.status,
                    "Cluster in error/degraded state: {}",
                    message
                );
                mark_all_false(
                    scope,
                    &[GKE_CONTROL_PLANE_READY_CONDITION, READY_CONDITION],
                    GKE_CONTROL_PLANE_ERROR_REASON,
                    ConditionSeverity::Error,
                    &message,
                );
                set_readiness(scope, false, false);
                // No automatic recovery; a later watch event retries.
                return Ok(ReconcileResult::done());
            }
            ClusterStatus::Running => {
                debug!(cluster = %scope.cluster_name(), "Cluster running");
            }
            other => {
                error!(cluster = %scope.cluster_name(), status = %other, "Unhandled cluster status");
                return Err(ServiceError::UnexpectedClusterStatus(other.to_string()));
            }
        }

        if let Some(update) = pending_update(
            &scope.control_plane.spec,
            &cluster,
            &scope.cluster_full_name(),
        )? {
            let field = update.field();
            info!(cluster = %scope.cluster_name(), field, "Cluster update required");
            self.apply_update(update).await?;
            metrics::increment_cluster_updates(field);
            info!(cluster = %scope.cluster_name(), field, "Cluster update in progress");

            condition::mark_true(&mut scope.control_plane, GKE_CONTROL_PLANE_UPDATING_CONDITION);
            set_readiness(scope, true, true);
            return Ok(ReconcileResult::requeue_after(DEFAULT_RETRY_TIME));
        }

        condition::mark_false(
            &mut scope.control_plane,
            GKE_CONTROL_PLANE_UPDATING_CONDITION,
            GKE_CONTROL_PLANE_UPDATED_REASON,
            ConditionSeverity::Info,
            "",
        );

        self.reconcile_kubeconfig(scope, &cluster).await?;

        scope.set_endpoint(&cluster.endpoint);
        condition::mark_true(&mut scope.control_plane, READY_CONDITION);
        condition::mark_true(&mut scope.control_plane, GKE_CONTROL_PLANE_READY_CONDITION);
        condition::mark_false(
            &mut scope.control_plane,
            GKE_CONTROL_PLANE_CREATING_CONDITION,
            GKE_CONTROL_PLANE_CREATED_REASON,
            ConditionSeverity::Info,
            "",
        );
        set_readiness(scope, true, true);

        info!(cluster = %scope.cluster_name(), "✅ Cluster reconciled");
        Ok(ReconcileResult::done())
    }

    /// Start deleting the GKE cluster, or record that it is gone.
    ///
    /// # Errors
    ///
    /// Returns describe and delete failures.
    pub async fn delete(
        &self,
        scope: &mut ManagedControlPlaneScope,
    ) -> Result<ReconcileResult, ServiceError> {
        info!(cluster = %scope.cluster_name(), "Deleting cluster resources");

        let Some(cluster) = self.describe(scope).await? else {
            info!(cluster = %scope.cluster_name(), "Cluster already deleted");
            condition::mark_false(
                &mut scope.control_plane,
                GKE_CONTROL_PLANE_DELETING_CONDITION,
                GKE_CONTROL_PLANE_DELETED_REASON,
                ConditionSeverity::Info,
                "",
            );
            return Ok(ReconcileResult::done());
        };

        match cluster.status {
            ClusterStatus::Provisioning | ClusterStatus::Reconciling => {
                info!(
                    cluster = %scope.cluster_name(),
                    status = %cluster.status,
                    "Cluster busy, waiting before delete"
                );
                return Ok(ReconcileResult::done());
            }
            ClusterStatus::Stopping => {
                info!(cluster = %scope.cluster_name(), "Cluster stopping in progress");
                condition::mark_false(
                    &mut scope.control_plane,
                    GKE_CONTROL_PLANE_READY_CONDITION,
                    GKE_CONTROL_PLANE_DELETING_REASON,
                    ConditionSeverity::Info,
                    "",
                );
                condition::mark_true(&mut scope.control_plane, GKE_CONTROL_PLANE_DELETING_CONDITION);
                return Ok(ReconcileResult::done());
            }
            _ => {}
        }

        if let Err(e) = self.clusters.delete_cluster(&scope.cluster_full_name()).await {
            error!(cluster = %scope.cluster_name(), error = %e, "Error deleting GKE cluster");
            condition::mark_false(
                &mut scope.control_plane,
                GKE_CONTROL_PLANE_DELETING_CONDITION,
                GKE_CONTROL_PLANE_RECONCILIATION_FAILED_REASON,
                ConditionSeverity::Error,
                &e.to_string(),
            );
            return Err(e.into());
        }

        info!(cluster = %scope.cluster_name(), "Cluster deleting in progress");
        set_readiness(scope, false, false);
        mark_all_false(
            scope,
            &[READY_CONDITION, GKE_CONTROL_PLANE_READY_CONDITION],
            GKE_CONTROL_PLANE_DELETING_REASON,
            ConditionSeverity::Info,
            "",
        );
        condition::mark_true(&mut scope.control_plane, GKE_CONTROL_PLANE_DELETING_CONDITION);
        Ok(ReconcileResult::done())
    }

    /// `None` when the cluster does not exist.
    async fn describe(
        &self,
        scope: &ManagedControlPlaneScope,
    ) -> Result<Option<Cluster>, CloudError> {
        match self.clusters.get_cluster(&scope.cluster_full_name()).await {
            Ok(cluster) => Ok(Some(cluster)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => {
                error!(cluster = %scope.cluster_name(), error = %e, "Error getting GKE cluster");
                Err(e)
            }
        }
    }

    async fn reconcile_absent(
        &self,
        scope: &mut ManagedControlPlaneScope,
    ) -> Result<ReconcileResult, ServiceError> {
        let pools = match scope.owned_machine_pools().await {
            Ok(pools) => pools,
            Err(e) => {
                mark_all_false(
                    scope,
                    &CREATE_CONDITIONS,
                    GKE_CONTROL_PLANE_RECONCILIATION_FAILED_REASON,
                    ConditionSeverity::Error,
                    &e.to_string(),
                );
                return Err(e.into());
            }
        };

        if scope.is_autopilot() && !pools.is_empty() {
            error!(
                cluster = %scope.cluster_name(),
                "{} machine pools defined for an autopilot cluster",
                pools.len()
            );
            mark_all_false(
                scope,
                &CREATE_CONDITIONS,
                GKE_CONTROL_PLANE_REQUIRES_AT_LEAST_ONE_NODE_POOL_REASON,
                ConditionSeverity::Info,
                "",
            );
            return Err(ServiceError::AutopilotClusterMachinePoolsNotAllowed);
        }
        if !scope.is_autopilot() && pools.is_empty() {
            info!(
                cluster = %scope.cluster_name(),
                "At least 1 node pool is required to create GKE cluster with autopilot disabled"
            );
            mark_all_false(
                scope,
                &CREATE_CONDITIONS,
                GKE_CONTROL_PLANE_REQUIRES_AT_LEAST_ONE_NODE_POOL_REASON,
                ConditionSeverity::Info,
                "",
            );
            return Ok(ReconcileResult::requeue_after(DEFAULT_RETRY_TIME));
        }

        if let Err(e) = self.create_cluster(scope, &pools).await {
            error!(cluster = %scope.cluster_name(), error = %e, "Failed creating cluster");
            mark_all_false(
                scope,
                &CREATE_CONDITIONS,
                GKE_CONTROL_PLANE_RECONCILIATION_FAILED_REASON,
                ConditionSeverity::Error,
                &e.to_string(),
            );
            return Err(e);
        }

        info!(cluster = %scope.cluster_name(), "Cluster created, provisioning in progress");
        mark_all_false(
            scope,
            &[READY_CONDITION, GKE_CONTROL_PLANE_READY_CONDITION],
            GKE_CONTROL_PLANE_CREATING_REASON,
            ConditionSeverity::Info,
            "",
        );
        condition::mark_true(&mut scope.control_plane, GKE_CONTROL_PLANE_CREATING_CONDITION);
        Ok(ReconcileResult::requeue_after(DEFAULT_RETRY_TIME))
    }

    async fn create_cluster(
        &self,
        scope: &ManagedControlPlaneScope,
        pools: &[GCPManagedMachinePool],
    ) -> Result<(), ServiceError> {
        let spec = &scope.control_plane.spec;

        let violations = validate_control_plane(spec);
        if !violations.is_empty() {
            return Err(ServiceError::InvalidSpec(summarize(&violations)));
        }

        debug!(cluster = %scope.cluster_name(), "Running pre-flight checks on machine pools");
        let violations = machine_pools_preflight(pools, scope.location().is_regional());
        if !violations.is_empty() {
            return Err(ServiceError::InvalidSpec(format!(
                "preflight checks on machine pools before cluster create: {}",
                summarize(&violations)
            )));
        }

        let cluster = Cluster {
            name: scope.cluster_name().to_string(),
            network: spec.network.clone(),
            autopilot: Some(Autopilot {
                enabled: spec.enable_autopilot,
            }),
            release_channel: Some(ReleaseChannel {
                channel: convert::release_channel(spec.release_channel),
            }),
            resource_labels: spec.resource_labels.clone(),
            addons_config: Some(convert::addons_config(spec.addons_config.as_ref())),
            logging_config: Some(convert::logging_config(spec.logging_config.as_ref())),
            master_authorized_networks_config: Some(convert::master_authorized_networks_config(
                spec.master_authorized_networks_config.as_ref(),
            )),
            shielded_nodes: Some(convert::shielded_nodes(spec.shielded_nodes.as_ref())),
            initial_cluster_version: spec.control_plane_version.clone().unwrap_or_default(),
            node_pools: if spec.enable_autopilot {
                Vec::new()
            } else {
                pools.iter().map(convert::node_pool).collect()
            },
            cluster_ipv4_cidr: spec.cluster_ipv4_cidr.clone().unwrap_or_default(),
            ip_allocation_policy: convert::ip_allocation_policy(spec.ip_allocation_policy.as_ref()),
            maintenance_policy: convert::maintenance_policy(spec.maintenance_policy.as_ref())?,
            network_config: spec
                .network_config
                .as_ref()
                .map(|config| convert::network_config(Some(config))),
            default_max_pods_constraint: spec.default_max_pods_constraint.map(|c| {
                MaxPodsConstraint {
                    max_pods_per_node: c.max_pods_per_node,
                }
            }),
            private_cluster_config: convert::private_cluster_config(
                spec.private_cluster_config.as_ref(),
            ),
            workload_identity_config: convert::workload_identity_config(
                spec.workload_identity_config.as_ref(),
            ),
            ..Cluster::default()
        };

        debug!(cluster = %scope.cluster_name(), "Creating GKE cluster");
        self.clusters
            .create_cluster(CreateClusterRequest {
                parent: scope.cluster_location(),
                cluster,
            })
            .await?;
        Ok(())
    }

    async fn apply_update(&self, update: PendingUpdate) -> Result<(), CloudError> {
        match update {
            PendingUpdate::Cluster { request, .. } => {
                self.clusters.update_cluster(request).await?;
            }
            PendingUpdate::MaintenancePolicy(request) => {
                self.clusters.set_maintenance_policy(request).await?;
            }
        }
        Ok(())
    }

    async fn reconcile_kubeconfig(
        &self,
        scope: &ManagedControlPlaneScope,
        cluster: &Cluster,
    ) -> Result<(), ServiceError> {
        let spec = KubeconfigSpec {
            cluster: scope
                .owner_cluster()
                .map_or_else(|| scope.name(), str::to_string),
            namespace: scope.namespace(),
            endpoint: cluster.endpoint.clone(),
            ca_data: cluster
                .master_auth
                .as_ref()
                .map(|auth| auth.cluster_ca_certificate.clone())
                .unwrap_or_default(),
        };
        if spec.ca_data.is_empty() {
            warn!(cluster = %scope.cluster_name(), "Cluster reports no CA certificate");
        }

        let rendered = render_kubeconfig(&spec)
            .map_err(|e| ServiceError::Conversion(format!("kubeconfig: {e}")))?;
        self.kubeconfig
            .write_kubeconfig(&spec, rendered)
            .await
            .map_err(|e| {
                error!(secret = %spec.secret_name(), error = %e, "Failed to reconcile kubeconfig");
                ServiceError::Kube(e)
            })
    }
}

fn set_readiness(scope: &mut ManagedControlPlaneScope, ready: bool, initialized: bool) {
    let status = scope.status_mut();
    status.ready = ready;
    status.initialized = initialized;
}

fn mark_all_false(
    scope: &mut ManagedControlPlaneScope,
    condition_types: &[&str],
    reason: &str,
    severity: ConditionSeverity,
    message: &str,
) {
    for condition_type in condition_types {
        condition::mark_false(&mut scope.control_plane, condition_type, reason, severity, message);
    }
}
