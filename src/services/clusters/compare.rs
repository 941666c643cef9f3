//! Equality of desired and observed GKE configuration.
//!
//! GKE reports a disabled feature either as an absent field or as an explicit
//! zero value, while desired state leaves it unset. Every function here
//! normalizes both shapes before comparing so a disabled feature is never
//! reported as drift.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};

use crate::container::model::{
    AddonsConfig, DnsConfig, LoggingConfig, MaintenancePolicy, MaintenanceWindow,
    MasterAuthorizedNetworksConfig, RecurringTimeWindow, TimeWindow, Toggle,
    WorkloadIdentityConfig,
};

fn toggle_enabled(toggle: Option<&Toggle>) -> bool {
    toggle.is_some_and(|t| t.enabled)
}

#[must_use]
pub fn addons_config_equal(a: Option<&AddonsConfig>, b: Option<&AddonsConfig>) -> bool {
    let default = AddonsConfig::default();
    let a = a.unwrap_or(&default);
    let b = b.unwrap_or(&default);

    toggle_enabled(a.dns_cache_config.as_ref()) == toggle_enabled(b.dns_cache_config.as_ref())
        && toggle_enabled(a.gce_persistent_disk_csi_driver_config.as_ref())
            == toggle_enabled(b.gce_persistent_disk_csi_driver_config.as_ref())
}

/// Component lists compare in order.
#[must_use]
pub fn logging_config_equal(a: Option<&LoggingConfig>, b: Option<&LoggingConfig>) -> bool {
    let components = |config: Option<&LoggingConfig>| {
        config
            .and_then(|c| c.component_config.as_ref())
            .map(|c| c.enable_components.as_slice())
            .unwrap_or_default()
            .to_vec()
    };
    components(a) == components(b)
}

/// Compares the maintenance windows. The `resourceVersion` stamp is ignored.
#[must_use]
pub fn maintenance_policy_equal(
    a: Option<&MaintenancePolicy>,
    b: Option<&MaintenancePolicy>,
) -> bool {
    let a = a.and_then(|p| p.window.as_ref());
    let b = b.and_then(|p| p.window.as_ref());

    let daily_start = |w: Option<&MaintenanceWindow>| {
        w.and_then(|w| w.daily_maintenance_window.as_ref())
            .map(|d| d.start_time.clone())
            .unwrap_or_default()
    };
    if daily_start(a) != daily_start(b) {
        return false;
    }

    if !recurring_window_equal(
        a.and_then(|w| w.recurring_window.as_ref()),
        b.and_then(|w| w.recurring_window.as_ref()),
    ) {
        return false;
    }

    let empty = BTreeMap::new();
    exclusions_equal(
        a.map_or(&empty, |w| &w.maintenance_exclusions),
        b.map_or(&empty, |w| &w.maintenance_exclusions),
    )
}

fn recurring_window_equal(a: Option<&RecurringTimeWindow>, b: Option<&RecurringTimeWindow>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.recurrence == b.recurrence && time_window_equal(a.window.as_ref(), b.window.as_ref())
        }
        _ => false,
    }
}

fn exclusions_equal(a: &BTreeMap<String, TimeWindow>, b: &BTreeMap<String, TimeWindow>) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(name, window)| time_window_equal(Some(window), b.get(name)))
}

/// Compares exclusion scope and the start and end instants.
///
/// Timestamps are compared as points in time, so `+00:00` and `Z` or
/// differing fractional precision do not register as drift.
#[must_use]
pub fn time_window_equal(a: Option<&TimeWindow>, b: Option<&TimeWindow>) -> bool {
    let (a, b) = match (a, b) {
        (None, None) => return true,
        (Some(a), Some(b)) => (a, b),
        _ => return false,
    };

    a.maintenance_exclusion_options == b.maintenance_exclusion_options
        && instant_equal(a.start_time.as_deref(), b.start_time.as_deref())
        && instant_equal(a.end_time.as_deref(), b.end_time.as_deref())
}

fn instant_equal(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => match (parse_instant(a), parse_instant(b)) {
            (Some(a), Some(b)) => a == b,
            // Unparseable values fall back to text.
            _ => a == b,
        },
        _ => false,
    }
}

fn parse_instant(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).ok()
}

#[must_use]
pub fn master_authorized_networks_config_equal(
    a: Option<&MasterAuthorizedNetworksConfig>,
    b: Option<&MasterAuthorizedNetworksConfig>,
) -> bool {
    let default = MasterAuthorizedNetworksConfig::default();
    let a = a.unwrap_or(&default);
    let b = b.unwrap_or(&default);

    a.enabled == b.enabled
        && a.gcp_public_cidrs_access_enabled.unwrap_or(false)
            == b.gcp_public_cidrs_access_enabled.unwrap_or(false)
        && a.cidr_blocks == b.cidr_blocks
}

#[must_use]
pub fn master_global_access_config_equal(a: Option<&Toggle>, b: Option<&Toggle>) -> bool {
    toggle_enabled(a) == toggle_enabled(b)
}

#[must_use]
pub fn workload_identity_config_equal(
    a: Option<&WorkloadIdentityConfig>,
    b: Option<&WorkloadIdentityConfig>,
) -> bool {
    let pool = |c: Option<&WorkloadIdentityConfig>| c.map(|c| c.workload_pool.clone()).unwrap_or_default();
    pool(a) == pool(b)
}

/// Compares DNS settings. An unset desired config expresses no opinion.
#[must_use]
pub fn dns_config_equal(desired: Option<&DnsConfig>, observed: Option<&DnsConfig>) -> bool {
    let Some(desired) = desired else {
        return true;
    };
    let default = DnsConfig::default();
    desired == observed.unwrap_or(&default)
}
