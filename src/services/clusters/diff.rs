//! Field-by-field drift detection for a running cluster.
//!
//! Fields are checked in a fixed order and only the first drifted one is
//! returned, so each pass issues at most one mutating call.

use crate::container::model::{
    Cluster, ClusterUpdate, ReleaseChannel, SetMaintenancePolicyRequest, UpdateClusterRequest,
};
use crate::crd::control_plane::GCPManagedControlPlaneSpec;
use crate::crd::convert::{self, ConversionError};
use crate::services::clusters::compare;

/// The single change needed to move the cluster toward its spec.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingUpdate {
    Cluster {
        field: &'static str,
        request: UpdateClusterRequest,
    },
    MaintenancePolicy(SetMaintenancePolicyRequest),
}

impl PendingUpdate {
    /// Field label used for logs and metrics.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::Cluster { field, .. } => field,
            Self::MaintenancePolicy(_) => "maintenance_policy",
        }
    }
}

/// First drifted field of `observed`, or `None` when the cluster matches.
///
/// # Errors
///
/// Returns a [`ConversionError`] when the maintenance policy does not convert.
pub fn pending_update(
    spec: &GCPManagedControlPlaneSpec,
    observed: &Cluster,
    full_name: &str,
) -> Result<Option<PendingUpdate>, ConversionError> {
    let update = |field: &'static str, update: ClusterUpdate| {
        Ok(Some(PendingUpdate::Cluster {
            field,
            request: UpdateClusterRequest {
                name: full_name.to_string(),
                update,
            },
        }))
    };

    let desired_channel = convert::release_channel(spec.release_channel);
    let observed_channel = observed
        .release_channel
        .as_ref()
        .map(|r| r.channel.clone())
        .unwrap_or_default();
    if desired_channel != observed_channel {
        return update(
            "release_channel",
            ClusterUpdate {
                desired_release_channel: Some(ReleaseChannel {
                    channel: desired_channel,
                }),
                ..ClusterUpdate::default()
            },
        );
    }

    if let Some(version) = &spec.control_plane_version {
        if !master_version_satisfied(version, observed) {
            return update(
                "master_version",
                ClusterUpdate {
                    desired_master_version: Some(version.clone()),
                    ..ClusterUpdate::default()
                },
            );
        }
    }

    let desired_man =
        convert::master_authorized_networks_config(spec.master_authorized_networks_config.as_ref());
    if !compare::master_authorized_networks_config_equal(
        Some(&desired_man),
        observed.master_authorized_networks_config.as_ref(),
    ) {
        return update(
            "master_authorized_networks",
            ClusterUpdate {
                desired_master_authorized_networks_config: Some(desired_man),
                ..ClusterUpdate::default()
            },
        );
    }

    let desired_addons = convert::addons_config(spec.addons_config.as_ref());
    if !compare::addons_config_equal(Some(&desired_addons), observed.addons_config.as_ref()) {
        return update(
            "addons",
            ClusterUpdate {
                desired_addons_config: Some(desired_addons),
                ..ClusterUpdate::default()
            },
        );
    }

    // DNS settings are only comparable once GKE reports a network config.
    if let Some(network) = &observed.network_config {
        let desired_dns = convert::network_config(spec.network_config.as_ref()).dns_config;
        if !compare::dns_config_equal(desired_dns.as_ref(), network.dns_config.as_ref()) {
            return update(
                "dns",
                ClusterUpdate {
                    desired_dns_config: desired_dns,
                    ..ClusterUpdate::default()
                },
            );
        }
    }

    let desired_global_access = convert::private_cluster_config(spec.private_cluster_config.as_ref())
        .and_then(|c| c.master_global_access_config);
    let observed_global_access = observed
        .private_cluster_config
        .as_ref()
        .and_then(|c| c.master_global_access_config);
    if !compare::master_global_access_config_equal(
        desired_global_access.as_ref(),
        observed_global_access.as_ref(),
    ) {
        // Only global access is mutable on an existing private cluster.
        let mut private = observed.private_cluster_config.clone().unwrap_or_default();
        private.master_global_access_config = desired_global_access;
        return update(
            "master_global_access",
            ClusterUpdate {
                desired_private_cluster_config: Some(private),
                ..ClusterUpdate::default()
            },
        );
    }

    let desired_shielded = convert::shielded_nodes(spec.shielded_nodes.as_ref());
    if observed
        .shielded_nodes
        .map_or(true, |s| s.enabled != desired_shielded.enabled)
    {
        return update(
            "shielded_nodes",
            ClusterUpdate {
                desired_shielded_nodes: Some(desired_shielded),
                ..ClusterUpdate::default()
            },
        );
    }

    let desired_identity = convert::workload_identity_config(spec.workload_identity_config.as_ref());
    if !compare::workload_identity_config_equal(
        desired_identity.as_ref(),
        observed.workload_identity_config.as_ref(),
    ) {
        return update(
            "workload_identity",
            ClusterUpdate {
                // An empty pool disables workload identity.
                desired_workload_identity_config: Some(desired_identity.unwrap_or_default()),
                ..ClusterUpdate::default()
            },
        );
    }

    let desired_logging = convert::logging_config(spec.logging_config.as_ref());
    if !compare::logging_config_equal(Some(&desired_logging), observed.logging_config.as_ref()) {
        return update(
            "logging",
            ClusterUpdate {
                desired_logging_config: Some(desired_logging),
                ..ClusterUpdate::default()
            },
        );
    }

    let desired_maintenance = convert::maintenance_policy(spec.maintenance_policy.as_ref())?;
    if !compare::maintenance_policy_equal(
        desired_maintenance.as_ref(),
        observed.maintenance_policy.as_ref(),
    ) {
        let mut policy = desired_maintenance.unwrap_or_default();
        policy.resource_version = observed
            .maintenance_policy
            .as_ref()
            .map(|p| p.resource_version.clone())
            .unwrap_or_default();
        return Ok(Some(PendingUpdate::MaintenancePolicy(
            SetMaintenancePolicyRequest {
                name: full_name.to_string(),
                maintenance_policy: policy,
            },
        )));
    }

    Ok(None)
}

/// True when the running master already satisfies the requested version.
///
/// A partial version such as `1.29` matches any patch release under it, and
/// `latest` or `-` match whatever GKE is running.
fn master_version_satisfied(desired: &str, observed: &Cluster) -> bool {
    let current = if observed.current_master_version.is_empty() {
        &observed.initial_cluster_version
    } else {
        &observed.current_master_version
    };
    if desired == "latest" || desired == "-" || current == desired {
        return true;
    }
    current
        .strip_prefix(desired)
        .is_some_and(|rest| rest.starts_with(['.', '-']))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::model::{
        self, AddonsConfig, Channel, LoggingComponent, LoggingComponentConfig, LoggingConfig,
        MasterAuthorizedNetworksConfig, ShieldedNodes, Toggle,
    };
    use crate::crd::control_plane::{
        MaintenancePolicy, PrivateClusterConfig, ReleaseChannel as SpecChannel, TimeWindow,
        WorkloadIdentityConfig,
    };

    const NAME: &str = "projects/p/locations/europe-west2/clusters/c";

    /// A cluster that matches an empty spec.
    fn converged() -> Cluster {
        Cluster {
            release_channel: Some(ReleaseChannel {
                channel: Channel::Unspecified,
            }),
            master_authorized_networks_config: Some(MasterAuthorizedNetworksConfig::default()),
            addons_config: Some(AddonsConfig {
                dns_cache_config: Some(Toggle { enabled: false }),
                gce_persistent_disk_csi_driver_config: Some(Toggle { enabled: true }),
            }),
            shielded_nodes: Some(ShieldedNodes { enabled: true }),
            logging_config: Some(LoggingConfig {
                component_config: Some(LoggingComponentConfig::default()),
            }),
            ..Cluster::default()
        }
    }

    fn cluster_update(pending: Option<PendingUpdate>) -> (&'static str, ClusterUpdate) {
        match pending {
            Some(PendingUpdate::Cluster { field, request }) => {
                assert_eq!(request.name, NAME);
                (field, request.update)
            }
            other => panic!("expected a cluster update, got {other:?}"),
        }
    }

    #[test]
    fn test_converged_cluster_has_no_update() {
        let spec = GCPManagedControlPlaneSpec::default();
        assert_eq!(pending_update(&spec, &converged(), NAME).unwrap(), None);
    }

    #[test]
    fn test_release_channel_drift() {
        let spec = GCPManagedControlPlaneSpec {
            release_channel: Some(SpecChannel::Stable),
            ..GCPManagedControlPlaneSpec::default()
        };
        let (field, update) = cluster_update(pending_update(&spec, &converged(), NAME).unwrap());
        assert_eq!(field, "release_channel");
        assert_eq!(
            update,
            ClusterUpdate {
                desired_release_channel: Some(ReleaseChannel {
                    channel: Channel::Stable
                }),
                ..ClusterUpdate::default()
            }
        );
    }

    #[test]
    fn test_only_first_drift_is_reported() {
        // Version and shielded nodes both drift; version comes first.
        let spec = GCPManagedControlPlaneSpec {
            control_plane_version: Some("1.29.1-gke.100".to_string()),
            shielded_nodes: Some(crate::crd::control_plane::ShieldedNodes { enabled: false }),
            ..GCPManagedControlPlaneSpec::default()
        };
        let (field, update) = cluster_update(pending_update(&spec, &converged(), NAME).unwrap());
        assert_eq!(field, "master_version");
        assert_eq!(update.desired_master_version.as_deref(), Some("1.29.1-gke.100"));
        assert!(update.desired_shielded_nodes.is_none());
    }

    #[test]
    fn test_partial_master_version_matches_patch_release() {
        let spec = GCPManagedControlPlaneSpec {
            control_plane_version: Some("1.29".to_string()),
            ..GCPManagedControlPlaneSpec::default()
        };
        let mut cluster = converged();
        cluster.initial_cluster_version = "1.28".to_string();
        cluster.current_master_version = "1.29.4-gke.1".to_string();
        assert_eq!(pending_update(&spec, &cluster, NAME).unwrap(), None);

        cluster.current_master_version = "1.290.0".to_string();
        let (field, _) = cluster_update(pending_update(&spec, &cluster, NAME).unwrap());
        assert_eq!(field, "master_version");
    }

    #[test]
    fn test_master_upgrade_converges_on_current_version() {
        let spec = GCPManagedControlPlaneSpec {
            control_plane_version: Some("1.30.2-gke.1".to_string()),
            ..GCPManagedControlPlaneSpec::default()
        };
        let mut cluster = converged();
        cluster.initial_cluster_version = "1.29.4-gke.1".to_string();
        cluster.current_master_version = "1.29.4-gke.1".to_string();
        let (field, update) = cluster_update(pending_update(&spec, &cluster, NAME).unwrap());
        assert_eq!(field, "master_version");
        assert_eq!(update.desired_master_version.as_deref(), Some("1.30.2-gke.1"));

        // Upgrade finished; initial version never changes.
        cluster.current_master_version = "1.30.2-gke.1".to_string();
        assert_eq!(pending_update(&spec, &cluster, NAME).unwrap(), None);
    }

    #[test]
    fn test_master_version_falls_back_to_initial_version() {
        let spec = GCPManagedControlPlaneSpec {
            control_plane_version: Some("1.29.4-gke.1".to_string()),
            ..GCPManagedControlPlaneSpec::default()
        };
        let mut cluster = converged();
        cluster.initial_cluster_version = "1.29.4-gke.1".to_string();
        cluster.current_master_version = String::new();
        assert_eq!(pending_update(&spec, &cluster, NAME).unwrap(), None);
    }

    #[test]
    fn test_dns_ignored_without_observed_network_config() {
        let spec: GCPManagedControlPlaneSpec = serde_json::from_value(serde_json::json!({
            "project": "p",
            "location": "europe-west2",
            "networkConfig": { "dnsConfig": { "clusterDNS": "cloud-dns" } }
        }))
        .unwrap();
        assert_eq!(pending_update(&spec, &converged(), NAME).unwrap(), None);

        let mut cluster = converged();
        cluster.network_config = Some(model::NetworkConfig::default());
        let (field, update) = cluster_update(pending_update(&spec, &cluster, NAME).unwrap());
        assert_eq!(field, "dns");
        assert_eq!(
            update.desired_dns_config.unwrap().cluster_dns,
            model::DnsProvider::CloudDns
        );
    }

    #[test]
    fn test_global_access_keeps_observed_private_config() {
        let spec = GCPManagedControlPlaneSpec {
            private_cluster_config: Some(PrivateClusterConfig {
                enable_private_nodes: true,
                private_cluster_master_global_access_enabled: Some(true),
                ..PrivateClusterConfig::default()
            }),
            ..GCPManagedControlPlaneSpec::default()
        };
        let mut cluster = converged();
        cluster.private_cluster_config = Some(model::PrivateClusterConfig {
            enable_private_nodes: true,
            master_ipv4_cidr_block: "172.16.0.0/28".to_string(),
            master_global_access_config: Some(Toggle { enabled: false }),
            ..model::PrivateClusterConfig::default()
        });

        let (field, update) = cluster_update(pending_update(&spec, &cluster, NAME).unwrap());
        assert_eq!(field, "master_global_access");
        let private = update.desired_private_cluster_config.unwrap();
        assert_eq!(private.master_ipv4_cidr_block, "172.16.0.0/28");
        assert_eq!(private.master_global_access_config, Some(Toggle { enabled: true }));
    }

    #[test]
    fn test_missing_shielded_nodes_triggers_update() {
        let mut cluster = converged();
        cluster.shielded_nodes = None;
        let (field, update) = cluster_update(
            pending_update(&GCPManagedControlPlaneSpec::default(), &cluster, NAME).unwrap(),
        );
        assert_eq!(field, "shielded_nodes");
        assert_eq!(update.desired_shielded_nodes, Some(ShieldedNodes { enabled: true }));
    }

    #[test]
    fn test_disabling_workload_identity_sends_empty_config() {
        let mut cluster = converged();
        cluster.workload_identity_config = Some(model::WorkloadIdentityConfig {
            workload_pool: "p.svc.id.goog".to_string(),
        });
        let (field, update) = cluster_update(
            pending_update(&GCPManagedControlPlaneSpec::default(), &cluster, NAME).unwrap(),
        );
        assert_eq!(field, "workload_identity");
        assert_eq!(
            update.desired_workload_identity_config,
            Some(model::WorkloadIdentityConfig::default())
        );

        let spec = GCPManagedControlPlaneSpec {
            workload_identity_config: Some(WorkloadIdentityConfig {
                workload_pool: "p.svc.id.goog".to_string(),
            }),
            ..GCPManagedControlPlaneSpec::default()
        };
        assert_eq!(pending_update(&spec, &cluster, NAME).unwrap(), None);
    }

    #[test]
    fn test_logging_drift() {
        let mut cluster = converged();
        cluster.logging_config = Some(LoggingConfig {
            component_config: Some(LoggingComponentConfig {
                enable_components: vec![LoggingComponent::SystemComponents],
            }),
        });
        let (field, update) = cluster_update(
            pending_update(&GCPManagedControlPlaneSpec::default(), &cluster, NAME).unwrap(),
        );
        assert_eq!(field, "logging");
        assert_eq!(
            update
                .desired_logging_config
                .unwrap()
                .component_config
                .unwrap()
                .enable_components,
            Vec::<LoggingComponent>::new()
        );
    }

    #[test]
    fn test_maintenance_policy_carries_resource_version() {
        let spec = GCPManagedControlPlaneSpec {
            maintenance_policy: Some(MaintenancePolicy {
                maintenance_exclusions: [(
                    "holidays".to_string(),
                    TimeWindow {
                        start_time: "2026-12-20T00:00:00Z".to_string(),
                        end_time: "2027-01-02T00:00:00Z".to_string(),
                        maintenance_exclusion_option: None,
                    },
                )]
                .into(),
                daily_maintenance_window: Some(crate::crd::control_plane::DailyMaintenanceWindow {
                    start_time: "03:00".to_string(),
                }),
                ..MaintenancePolicy::default()
            }),
            ..GCPManagedControlPlaneSpec::default()
        };
        let mut cluster = converged();
        cluster.maintenance_policy = Some(model::MaintenancePolicy {
            window: None,
            resource_version: "abc123".to_string(),
        });

        let pending = pending_update(&spec, &cluster, NAME).unwrap().unwrap();
        assert_eq!(pending.field(), "maintenance_policy");
        let PendingUpdate::MaintenancePolicy(request) = pending else {
            panic!("expected a maintenance policy update");
        };
        assert_eq!(request.name, NAME);
        assert_eq!(request.maintenance_policy.resource_version, "abc123");
        assert!(request.maintenance_policy.window.is_some());
    }

    #[test]
    fn test_removed_maintenance_policy_sends_empty_policy() {
        let mut cluster = converged();
        cluster.maintenance_policy = Some(model::MaintenancePolicy {
            window: Some(model::MaintenanceWindow {
                daily_maintenance_window: Some(model::DailyMaintenanceWindow {
                    start_time: "03:00".to_string(),
                }),
                ..model::MaintenanceWindow::default()
            }),
            resource_version: "v7".to_string(),
        });
        let pending = pending_update(&GCPManagedControlPlaneSpec::default(), &cluster, NAME)
            .unwrap()
            .unwrap();
        assert_eq!(
            pending,
            PendingUpdate::MaintenancePolicy(SetMaintenancePolicyRequest {
                name: NAME.to_string(),
                maintenance_policy: model::MaintenancePolicy {
                    window: None,
                    resource_version: "v7".to_string(),
                },
            })
        );
    }
}
