//! # Conditions
//!
//! Cluster API style status conditions shared by both managed resources.
//!
//! Conditions are written through [`mark_true`] and [`mark_false`], which
//! compare against the existing entry before touching it. The
//! `lastTransitionTime` only moves when the condition's status flips, so
//! consumers can compute how long a resource has been in a given state.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Summary condition set on every managed resource.
pub const READY_CONDITION: &str = "Ready";

pub const GKE_CONTROL_PLANE_READY_CONDITION: &str = "GKEControlPlaneReady";
pub const GKE_CONTROL_PLANE_CREATING_CONDITION: &str = "GKEControlPlaneCreating";
pub const GKE_CONTROL_PLANE_UPDATING_CONDITION: &str = "GKEControlPlaneUpdating";
pub const GKE_CONTROL_PLANE_DELETING_CONDITION: &str = "GKEControlPlaneDeleting";

pub const GKE_CONTROL_PLANE_CREATING_REASON: &str = "GKEControlPlaneCreating";
pub const GKE_CONTROL_PLANE_CREATED_REASON: &str = "GKEControlPlaneCreated";
pub const GKE_CONTROL_PLANE_UPDATED_REASON: &str = "GKEControlPlaneUpdated";
pub const GKE_CONTROL_PLANE_DELETING_REASON: &str = "GKEControlPlaneDeleting";
pub const GKE_CONTROL_PLANE_DELETED_REASON: &str = "GKEControlPlaneDeleted";
pub const GKE_CONTROL_PLANE_ERROR_REASON: &str = "GKEControlPlaneError";
pub const GKE_CONTROL_PLANE_RECONCILIATION_FAILED_REASON: &str =
    "GKEControlPlaneReconciliationFailed";
pub const GKE_CONTROL_PLANE_REQUIRES_AT_LEAST_ONE_NODE_POOL_REASON: &str =
    "GKEControlPlaneRequiresAtLeastOneNodePool";

pub const GKE_MACHINE_POOL_READY_CONDITION: &str = "GKEMachinePoolReady";
pub const GKE_MACHINE_POOL_CREATING_CONDITION: &str = "GKEMachinePoolCreating";
pub const GKE_MACHINE_POOL_UPDATING_CONDITION: &str = "GKEMachinePoolUpdating";
pub const GKE_MACHINE_POOL_DELETING_CONDITION: &str = "GKEMachinePoolDeleting";

pub const GKE_MACHINE_POOL_CREATING_REASON: &str = "GKEMachinePoolCreating";
pub const GKE_MACHINE_POOL_CREATED_REASON: &str = "GKEMachinePoolCreated";
pub const GKE_MACHINE_POOL_UPDATED_REASON: &str = "GKEMachinePoolUpdated";
pub const GKE_MACHINE_POOL_DELETING_REASON: &str = "GKEMachinePoolDeleting";
pub const GKE_MACHINE_POOL_DELETED_REASON: &str = "GKEMachinePoolDeleted";
pub const GKE_MACHINE_POOL_ERROR_REASON: &str = "GKEMachinePoolError";
pub const GKE_MACHINE_POOL_RECONCILIATION_FAILED_REASON: &str =
    "GKEMachinePoolReconciliationFailed";
pub const WAITING_FOR_GKE_CONTROL_PLANE_REASON: &str = "WaitingForGKEControlPlane";

pub const STATUS_TRUE: &str = "True";
pub const STATUS_FALSE: &str = "False";

/// Severity of a `False` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum ConditionSeverity {
    Error,
    Warning,
    Info,
}

/// Condition represents an observation of a resource's state.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of condition (True, False, Unknown)
    pub status: String,
    /// Severity, only set when status is False
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<ConditionSeverity>,
    /// Last time the status flipped, RFC3339
    #[serde(default)]
    pub last_transition_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Condition {
    #[must_use]
    pub fn is_true(&self) -> bool {
        self.status == STATUS_TRUE
    }
}

/// Access to the condition list of a resource.
///
/// Implemented by the custom resources themselves so the reconcilers can
/// write conditions without knowing which kind they are handling.
pub trait ConditionSetter {
    fn conditions(&self) -> &[Condition];
    fn conditions_mut(&mut self) -> &mut Vec<Condition>;
}

/// Look up a condition by type.
pub fn get<'a, S: ConditionSetter + ?Sized>(setter: &'a S, condition_type: &str) -> Option<&'a Condition> {
    setter
        .conditions()
        .iter()
        .find(|c| c.r#type == condition_type)
}

/// Whether the condition exists and is `True`.
pub fn is_true<S: ConditionSetter + ?Sized>(setter: &S, condition_type: &str) -> bool {
    get(setter, condition_type).is_some_and(Condition::is_true)
}

/// Reason of the condition, if present.
pub fn reason<'a, S: ConditionSetter + ?Sized>(setter: &'a S, condition_type: &str) -> Option<&'a str> {
    get(setter, condition_type).and_then(|c| c.reason.as_deref())
}

/// Set the condition to `True`, clearing reason, severity and message.
pub fn mark_true<S: ConditionSetter + ?Sized>(setter: &mut S, condition_type: &str) {
    set_at(
        setter,
        Condition {
            r#type: condition_type.to_string(),
            status: STATUS_TRUE.to_string(),
            severity: None,
            last_transition_time: None,
            reason: None,
            message: None,
        },
        Utc::now(),
    );
}

/// Set the condition to `False` with the given reason, severity and message.
///
/// An empty message is stored as absent.
pub fn mark_false<S: ConditionSetter + ?Sized>(
    setter: &mut S,
    condition_type: &str,
    reason: &str,
    severity: ConditionSeverity,
    message: &str,
) {
    set_at(
        setter,
        Condition {
            r#type: condition_type.to_string(),
            status: STATUS_FALSE.to_string(),
            severity: Some(severity),
            last_transition_time: None,
            reason: Some(reason.to_string()),
            message: (!message.is_empty()).then(|| message.to_string()),
        },
        Utc::now(),
    );
}

/// Insert or update a condition.
///
/// The transition time of an existing condition is kept unless the status
/// changed; a new condition is stamped with `now`.
pub fn set_at<S: ConditionSetter + ?Sized>(setter: &mut S, mut condition: Condition, now: DateTime<Utc>) {
    let conditions = setter.conditions_mut();
    match conditions
        .iter_mut()
        .find(|c| c.r#type == condition.r#type)
    {
        Some(existing) => {
            if existing.status == condition.status {
                condition
                    .last_transition_time
                    .clone_from(&existing.last_transition_time);
            } else {
                condition.last_transition_time = Some(now.to_rfc3339());
            }
            if *existing != condition {
                *existing = condition;
            }
        }
        None => {
            condition.last_transition_time = Some(now.to_rfc3339());
            conditions.push(condition);
        }
    }
}
