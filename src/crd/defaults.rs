//! Defaulting applied to control planes before they are reconciled.

use sha2::{Digest, Sha256};

use crate::crd::control_plane::{GCPManagedControlPlane, LoggingComponent};

/// GKE limits cluster names to 40 characters.
pub const MAX_CLUSTER_NAME_LENGTH: usize = 40;

const RESOURCE_PREFIX: &str = "capg-";
const HASHED_NAME_LENGTH: usize = 32;

/// Derive a GKE cluster name from namespace and object name.
///
/// Short names are kept readable as `{namespace}-{name}`; anything that
/// would not fit becomes a stable hash with the `capg-` prefix.
#[must_use]
pub fn generate_gke_name(resource_name: &str, namespace: &str) -> String {
    let escaped = resource_name.replace('.', "-");
    let gke_name = format!("{namespace}-{escaped}");
    if gke_name.len() < MAX_CLUSTER_NAME_LENGTH {
        return gke_name;
    }

    let hash = base36_truncated_hash(&gke_name, HASHED_NAME_LENGTH - RESOURCE_PREFIX.len());
    format!("{RESOURCE_PREFIX}{hash}")
}

/// SHA-256 of `value` rendered in lowercase base36, truncated to `len`.
fn base36_truncated_hash(value: &str, len: usize) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let mut number: Vec<u8> = Sha256::digest(value.as_bytes()).to_vec();
    let mut digits = Vec::new();

    // Repeated long division of the big-endian digest by 36.
    while number.iter().any(|&b| b != 0) {
        let mut remainder = 0u32;
        for byte in &mut number {
            let acc = (remainder << 8) | u32::from(*byte);
            *byte = u8::try_from(acc / 36).unwrap_or(u8::MAX);
            remainder = acc % 36;
        }
        digits.push(DIGITS[remainder as usize]);
    }
    if digits.is_empty() {
        digits.push(b'0');
    }
    digits.reverse();
    digits.truncate(len);
    String::from_utf8_lossy(&digits).into_owned()
}

/// Fill in defaulted fields. Returns true when the spec changed.
pub fn default_control_plane(control_plane: &mut GCPManagedControlPlane) -> bool {
    let mut changed = false;

    if control_plane.spec.cluster_name.is_empty() {
        let name = control_plane.metadata.name.as_deref().unwrap_or_default();
        let namespace = control_plane.metadata.namespace.as_deref().unwrap_or_default();
        control_plane.spec.cluster_name = generate_gke_name(name, namespace);
        changed = true;
    }

    // system-components must be on whenever any component is.
    if let Some(logging) = control_plane.spec.logging_config.as_mut() {
        if !logging.enable_components.is_empty()
            && !logging
                .enable_components
                .contains(&LoggingComponent::SystemComponents)
        {
            logging
                .enable_components
                .push(LoggingComponent::SystemComponents);
            changed = true;
        }
    }

    changed
}
