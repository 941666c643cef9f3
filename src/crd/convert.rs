//! Conversion of custom resource specs into Container API shapes.
//!
//! Each function returns the *desired* value for one cluster field. Where
//! an unset spec field means "feature disabled" the function returns the
//! explicit disabled value, so the diff against an observed cluster that
//! has the feature on is detected.

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::container::model;
use crate::crd::control_plane::{
    AddonsConfig, ClusterDns, ClusterDnsScope, DatapathProvider, IPAllocationPolicy,
    LoggingComponent, LoggingConfig, MaintenanceExclusionOption, MaintenancePolicy,
    MasterAuthorizedNetworksConfig, NetworkConfig, PrivateClusterConfig, ReleaseChannel,
    ShieldedNodes, TimeWindow, WorkloadIdentityConfig,
};
use crate::crd::machine_pool::{GCPManagedMachinePool, LocationPolicy, Taint, TaintEffect};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {field} {value:?}: {reason}")]
pub struct ConversionError {
    pub field: &'static str,
    pub value: String,
    pub reason: String,
}

#[must_use]
pub fn release_channel(channel: Option<ReleaseChannel>) -> model::Channel {
    match channel {
        None => model::Channel::Unspecified,
        Some(ReleaseChannel::Rapid) => model::Channel::Rapid,
        Some(ReleaseChannel::Regular) => model::Channel::Regular,
        Some(ReleaseChannel::Stable) => model::Channel::Stable,
    }
}

/// DNS cache defaults to off, the persistent disk CSI driver to on.
#[must_use]
pub fn addons_config(config: Option<&AddonsConfig>) -> model::AddonsConfig {
    let dns_cache = config
        .and_then(|c| c.dns_cache_config)
        .map_or(false, |t| t.enabled);
    let pd_csi = config
        .and_then(|c| c.gce_persistent_disk_csi_driver_config)
        .map_or(true, |t| t.enabled);

    model::AddonsConfig {
        dns_cache_config: Some(model::Toggle { enabled: dns_cache }),
        gce_persistent_disk_csi_driver_config: Some(model::Toggle { enabled: pd_csi }),
    }
}

#[must_use]
pub fn ip_allocation_policy(policy: Option<&IPAllocationPolicy>) -> Option<model::IpAllocationPolicy> {
    policy.map(|p| model::IpAllocationPolicy {
        use_ip_aliases: p.use_ip_aliases.unwrap_or(false),
        cluster_secondary_range_name: p.cluster_secondary_range_name.clone().unwrap_or_default(),
        services_secondary_range_name: p.services_secondary_range_name.clone().unwrap_or_default(),
        cluster_ipv4_cidr_block: p.cluster_ipv4_cidr_block.clone().unwrap_or_default(),
        services_ipv4_cidr_block: p.services_ipv4_cidr_block.clone().unwrap_or_default(),
    })
}

/// An unset logging config disables every component.
#[must_use]
pub fn logging_config(config: Option<&LoggingConfig>) -> model::LoggingConfig {
    let enable_components = config
        .map(|c| {
            c.enable_components
                .iter()
                .map(|component| match component {
                    LoggingComponent::SystemComponents => model::LoggingComponent::SystemComponents,
                    LoggingComponent::Workloads => model::LoggingComponent::Workloads,
                    LoggingComponent::ApiServer => model::LoggingComponent::ApiServer,
                    LoggingComponent::Scheduler => model::LoggingComponent::Scheduler,
                    LoggingComponent::ControllerManager => {
                        model::LoggingComponent::ControllerManager
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    model::LoggingConfig {
        component_config: Some(model::LoggingComponentConfig { enable_components }),
    }
}

/// Parse and normalize an RFC3339 timestamp.
///
/// # Errors
///
/// Returns a [`ConversionError`] when the value is not valid RFC3339.
pub fn rfc3339(field: &'static str, value: &str) -> Result<String, ConversionError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::AutoSi, true))
        .map_err(|e| ConversionError {
            field,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// # Errors
///
/// Returns a [`ConversionError`] when either bound is not valid RFC3339.
pub fn time_window(window: &TimeWindow) -> Result<model::TimeWindow, ConversionError> {
    let start_time = rfc3339("startTime", &window.start_time)?;
    let end_time = rfc3339("endTime", &window.end_time)?;
    let options = window
        .maintenance_exclusion_option
        .map(|option| model::MaintenanceExclusionOptions {
            scope: match option {
                MaintenanceExclusionOption::NoUpgrades => model::ExclusionScope::NoUpgrades,
                MaintenanceExclusionOption::NoMinorUpgrades => {
                    model::ExclusionScope::NoMinorUpgrades
                }
                MaintenanceExclusionOption::NoMinorOrNodeUpgrades => {
                    model::ExclusionScope::NoMinorOrNodeUpgrades
                }
            },
        });

    Ok(model::TimeWindow {
        start_time: Some(start_time),
        end_time: Some(end_time),
        maintenance_exclusion_options: options,
    })
}

/// `None` when no maintenance policy is requested.
///
/// # Errors
///
/// Returns a [`ConversionError`] when a time window does not parse.
pub fn maintenance_policy(
    policy: Option<&MaintenancePolicy>,
) -> Result<Option<model::MaintenancePolicy>, ConversionError> {
    let Some(policy) = policy else {
        return Ok(None);
    };

    let maintenance_exclusions = policy
        .maintenance_exclusions
        .iter()
        .map(|(name, window)| Ok((name.clone(), time_window(window)?)))
        .collect::<Result<_, ConversionError>>()?;

    let daily_maintenance_window = policy.daily_maintenance_window.as_ref().map(|daily| {
        model::DailyMaintenanceWindow {
            start_time: daily.start_time.clone(),
        }
    });

    let recurring_window = match &policy.recurring_maintenance_window {
        Some(recurring) => Some(model::RecurringTimeWindow {
            window: recurring.window.as_ref().map(time_window).transpose()?,
            recurrence: recurring.recurrence.clone(),
        }),
        None => None,
    };

    let window = (daily_maintenance_window.is_some() || recurring_window.is_some()).then(|| {
        model::MaintenanceWindow {
            daily_maintenance_window,
            recurring_window,
            maintenance_exclusions,
        }
    });

    Ok(Some(model::MaintenancePolicy {
        window,
        resource_version: String::new(),
    }))
}

/// An unset config disables master authorized networks.
#[must_use]
pub fn master_authorized_networks_config(
    config: Option<&MasterAuthorizedNetworksConfig>,
) -> model::MasterAuthorizedNetworksConfig {
    match config {
        None => model::MasterAuthorizedNetworksConfig {
            enabled: false,
            cidr_blocks: Vec::new(),
            gcp_public_cidrs_access_enabled: Some(false),
        },
        Some(config) => model::MasterAuthorizedNetworksConfig {
            enabled: true,
            cidr_blocks: config
                .cidr_blocks
                .iter()
                .map(|block| model::CidrBlock {
                    display_name: block.display_name.clone(),
                    cidr_block: block.cidr_block.clone(),
                })
                .collect(),
            gcp_public_cidrs_access_enabled: config.gcp_public_cidrs_access_enabled,
        },
    }
}

#[must_use]
pub fn network_config(config: Option<&NetworkConfig>) -> model::NetworkConfig {
    let Some(config) = config else {
        return model::NetworkConfig::default();
    };

    let datapath_provider = config.datapath_provider.map(|provider| match provider {
        DatapathProvider::Legacy => model::DatapathProvider::LegacyDatapath,
        DatapathProvider::Advanced => model::DatapathProvider::AdvancedDatapath,
    });

    let dns_config = config.dns_config.as_ref().map(|dns| model::DnsConfig {
        cluster_dns: match dns.cluster_dns {
            None => model::DnsProvider::Unspecified,
            Some(ClusterDns::PlatformDefault) => model::DnsProvider::PlatformDefault,
            Some(ClusterDns::CloudDns) => model::DnsProvider::CloudDns,
            Some(ClusterDns::KubeDns) => model::DnsProvider::KubeDns,
        },
        cluster_dns_scope: match dns.cluster_dns_scope {
            None => model::DnsScope::Unspecified,
            Some(ClusterDnsScope::Cluster) => model::DnsScope::ClusterScope,
            Some(ClusterDnsScope::Vpc) => model::DnsScope::VpcScope,
        },
        cluster_dns_domain: dns.cluster_dns_domain.clone().unwrap_or_default(),
    });

    model::NetworkConfig {
        datapath_provider,
        dns_config,
    }
}

/// `None` when no private cluster is requested, matching what GKE reports
/// for public clusters.
#[must_use]
pub fn private_cluster_config(
    config: Option<&PrivateClusterConfig>,
) -> Option<model::PrivateClusterConfig> {
    config.map(|c| model::PrivateClusterConfig {
        enable_private_nodes: c.enable_private_nodes,
        enable_private_endpoint: c.enable_private_endpoint,
        master_ipv4_cidr_block: c.master_ipv4_cidr_block.clone().unwrap_or_default(),
        master_global_access_config: Some(model::Toggle {
            enabled: c.private_cluster_master_global_access_enabled.unwrap_or(false),
        }),
        private_endpoint_subnetwork: c.private_endpoint_subnetwork.clone().unwrap_or_default(),
    })
}

/// Shielded nodes are on unless explicitly disabled.
#[must_use]
pub fn shielded_nodes(config: Option<&ShieldedNodes>) -> model::ShieldedNodes {
    model::ShieldedNodes {
        enabled: config.map_or(true, |c| c.enabled),
    }
}

#[must_use]
pub fn workload_identity_config(
    config: Option<&WorkloadIdentityConfig>,
) -> Option<model::WorkloadIdentityConfig> {
    config.map(|c| model::WorkloadIdentityConfig {
        workload_pool: c.workload_pool.clone(),
    })
}

#[must_use]
pub fn taints(taints: &[Taint]) -> Vec<model::NodeTaint> {
    taints
        .iter()
        .map(|taint| model::NodeTaint {
            key: taint.key.clone(),
            value: taint.value.clone(),
            effect: match taint.effect {
                TaintEffect::NoSchedule => model::TaintEffect::NoSchedule,
                TaintEffect::NoExecute => model::TaintEffect::NoExecute,
                TaintEffect::PreferNoSchedule => model::TaintEffect::PreferNoSchedule,
            },
        })
        .collect()
}

/// Node pool as submitted on create, either on its own or embedded in a
/// new cluster.
#[must_use]
pub fn node_pool(pool: &GCPManagedMachinePool) -> model::NodePool {
    let spec = &pool.spec;
    model::NodePool {
        name: pool.node_pool_name(),
        initial_node_count: spec.node_count,
        config: Some(model::NodeConfig {
            machine_type: spec.machine_type.clone().unwrap_or_default(),
            disk_size_gb: spec.disk_size_gb.unwrap_or_default(),
            disk_type: spec.disk_type.clone().unwrap_or_default(),
            image_type: spec.image_type.clone().unwrap_or_default(),
            local_ssd_count: spec.local_ssd_count.unwrap_or_default(),
            labels: spec.kubernetes_labels.clone(),
            taints: taints(&spec.kubernetes_taints),
            metadata: spec.additional_labels.clone(),
            resource_labels: spec.resource_labels.clone(),
        }),
        autoscaling: spec.scaling.as_ref().map(|scaling| model::NodePoolAutoscaling {
            enabled: scaling.enable_autoscaling.unwrap_or(true),
            min_node_count: scaling.min_count.unwrap_or_default(),
            max_node_count: scaling.max_count.unwrap_or_default(),
            location_policy: scaling.location_policy.map(|policy| match policy {
                LocationPolicy::Balanced => model::LocationPolicy::Balanced,
                LocationPolicy::Any => model::LocationPolicy::Any,
            }),
        }),
        version: spec.node_version.clone().unwrap_or_default(),
        ..model::NodePool::default()
    }
}
