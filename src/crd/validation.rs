//! Validation of desired state.
//!
//! Runs before a cluster is created. Every violation is collected so the
//! user sees all of them at once on the `Ready` condition.

use std::fmt;

use chrono::DateTime;

use crate::crd::control_plane::{GCPManagedControlPlaneSpec, MaintenanceExclusionOption, TimeWindow};
use crate::crd::defaults::MAX_CLUSTER_NAME_LENGTH;
use crate::crd::machine_pool::GCPManagedMachinePool;

const MAX_NO_UPGRADE_EXCLUSIONS: usize = 3;

/// One invalid field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Join field errors into one message.
#[must_use]
pub fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate a control plane spec.
#[must_use]
pub fn validate_control_plane(spec: &GCPManagedControlPlaneSpec) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if spec.cluster_name.len() > MAX_CLUSTER_NAME_LENGTH {
        errors.push(FieldError::new(
            "spec.clusterName",
            format!("cluster name cannot have more than {MAX_CLUSTER_NAME_LENGTH} characters"),
        ));
    }

    if spec.enable_autopilot && spec.release_channel.is_none() {
        errors.push(FieldError::new(
            "spec.releaseChannel",
            "release channel is required for an autopilot enabled cluster",
        ));
    }

    validate_ip_allocation_policy(spec, &mut errors);
    validate_default_max_pods_constraint(spec, &mut errors);
    validate_maintenance_policy(spec, &mut errors);
    validate_private_cluster_config(spec, &mut errors);

    errors
}

fn uses_ip_aliases(spec: &GCPManagedControlPlaneSpec) -> bool {
    spec.ip_allocation_policy
        .as_ref()
        .and_then(|p| p.use_ip_aliases)
        .unwrap_or(false)
}

fn validate_ip_allocation_policy(spec: &GCPManagedControlPlaneSpec, errors: &mut Vec<FieldError>) {
    let Some(policy) = &spec.ip_allocation_policy else {
        return;
    };
    let aliases = uses_ip_aliases(spec);

    let dependent = [
        ("clusterSecondaryRangeName", policy.cluster_secondary_range_name.is_some()),
        ("servicesSecondaryRangeName", policy.services_secondary_range_name.is_some()),
        ("servicesIpv4CidrBlock", policy.services_ipv4_cidr_block.is_some()),
        ("clusterIpv4CidrBlock", policy.cluster_ipv4_cidr_block.is_some()),
    ];
    for (field, set) in dependent {
        if set && !aliases {
            errors.push(FieldError::new(
                format!("spec.ipAllocationPolicy.{field}"),
                "field cannot be set unless useIPAliases is set to true",
            ));
        }
    }

    if policy.cluster_ipv4_cidr_block.is_some() && spec.cluster_ipv4_cidr.is_some() {
        errors.push(FieldError::new(
            "spec.ipAllocationPolicy.clusterIpv4CidrBlock",
            "only one of spec.clusterIpv4Cidr and spec.ipAllocationPolicy.clusterIpv4CidrBlock can be set",
        ));
    }
}

fn validate_default_max_pods_constraint(
    spec: &GCPManagedControlPlaneSpec,
    errors: &mut Vec<FieldError>,
) {
    if spec.default_max_pods_constraint.is_some() && !uses_ip_aliases(spec) {
        errors.push(FieldError::new(
            "spec.defaultMaxPodsConstraint",
            "field cannot be set unless useIPAliases is set to true",
        ));
    }
}

fn validate_maintenance_policy(spec: &GCPManagedControlPlaneSpec, errors: &mut Vec<FieldError>) {
    let Some(policy) = &spec.maintenance_policy else {
        return;
    };
    let path = "spec.maintenancePolicy";

    if policy.daily_maintenance_window.is_some() && policy.recurring_maintenance_window.is_some() {
        errors.push(FieldError::new(
            format!("{path}.dailyMaintenanceWindow"),
            "only one of dailyMaintenanceWindow and recurringMaintenanceWindow can be set",
        ));
    }

    if let Some(window) = policy
        .recurring_maintenance_window
        .as_ref()
        .and_then(|r| r.window.as_ref())
    {
        validate_time_window(window, &format!("{path}.recurringMaintenanceWindow"), errors);
    }

    let mut no_upgrades = 0;
    for (name, window) in &policy.maintenance_exclusions {
        validate_time_window(window, &format!("{path}.maintenanceExclusions[{name}]"), errors);
        // Unset counts as no-upgrades.
        if matches!(
            window.maintenance_exclusion_option,
            None | Some(MaintenanceExclusionOption::NoUpgrades)
        ) {
            no_upgrades += 1;
        }
    }
    if no_upgrades > MAX_NO_UPGRADE_EXCLUSIONS {
        errors.push(FieldError::new(
            format!("{path}.maintenanceExclusions"),
            format!("maximum of {MAX_NO_UPGRADE_EXCLUSIONS} `no-upgrades` maintenance exclusions allowed"),
        ));
    }
}

fn validate_time_window(window: &TimeWindow, path: &str, errors: &mut Vec<FieldError>) {
    let start = DateTime::parse_from_rfc3339(&window.start_time);
    if start.is_err() {
        errors.push(FieldError::new(path, "startTime must be a valid RFC3339 timestamp"));
    }
    let end = DateTime::parse_from_rfc3339(&window.end_time);
    if end.is_err() {
        errors.push(FieldError::new(path, "endTime must be a valid RFC3339 timestamp"));
    }
    if let (Ok(start), Ok(end)) = (start, end) {
        if start > end {
            errors.push(FieldError::new(path, "startTime cannot be after endTime"));
        }
    }
}

fn validate_private_cluster_config(spec: &GCPManagedControlPlaneSpec, errors: &mut Vec<FieldError>) {
    let Some(private) = &spec.private_cluster_config else {
        return;
    };
    if !private.enable_private_endpoint {
        return;
    }

    match &spec.master_authorized_networks_config {
        None => errors.push(FieldError::new(
            "spec.privateClusterConfig.enablePrivateEndpoint",
            "spec.masterAuthorizedNetworksConfig must be set if enablePrivateEndpoint is true",
        )),
        Some(man) if man.gcp_public_cidrs_access_enabled.unwrap_or(false) => {
            errors.push(FieldError::new(
                "spec.privateClusterConfig.enablePrivateEndpoint",
                "spec.masterAuthorizedNetworksConfig.gcpPublicCidrsAccessEnabled cannot be true if enablePrivateEndpoint is true",
            ));
        }
        Some(_) => {}
    }
}

/// Checks the machine pools a new cluster will be created with.
///
/// Regional clusters spread every pool across zones, so a pool must ask for
/// at least one node per zone unless autoscaling manages the count.
#[must_use]
pub fn machine_pools_preflight(pools: &[GCPManagedMachinePool], regional: bool) -> Vec<FieldError> {
    let mut errors = Vec::new();
    for pool in pools {
        let path = format!("machinePool[{}]", pool.node_pool_name());
        let spec = &pool.spec;
        let autoscaling = spec
            .scaling
            .as_ref()
            .is_some_and(|s| s.enable_autoscaling.unwrap_or(true));

        if spec.node_count < 0 {
            errors.push(FieldError::new(&path, "nodeCount cannot be negative"));
        } else if regional && spec.node_count == 0 && !autoscaling {
            errors.push(FieldError::new(
                &path,
                "nodeCount must be at least 1 per zone for a regional cluster",
            ));
        }

        if let Some(scaling) = &spec.scaling {
            if let (Some(min), Some(max)) = (scaling.min_count, scaling.max_count) {
                if min > max {
                    errors.push(FieldError::new(
                        &path,
                        "scaling.minCount cannot be greater than scaling.maxCount",
                    ));
                }
            }
        }
    }
    errors
}
