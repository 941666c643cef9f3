//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// HTTP port for `/metrics`, `/healthz` and `/readyz`
    pub metrics_port: u16,
    /// Upper bound for one reconcile pass (seconds)
    pub reconcile_timeout_secs: u64,
    /// Requeue while a control plane is being created (seconds)
    pub creating_requeue_secs: u64,
    /// Requeue while a deletion is in progress (seconds)
    pub deleting_requeue_secs: u64,
    /// Requeue after a converged pass (seconds)
    pub resync_interval_secs: u64,
    /// Fibonacci backoff floor for reconcile errors (minutes)
    pub backoff_min_minutes: u64,
    /// Fibonacci backoff ceiling for reconcile errors (minutes)
    pub backoff_max_minutes: u64,
    /// Restrict watches to one namespace. Empty watches all namespaces.
    pub watch_namespace: String,
    /// Global log level used when `RUST_LOG` is unset
    pub log_level: String,
    /// GKE Container API base URL override
    pub container_api_endpoint: Option<String>,
    /// Static bearer token. The metadata server is used when unset.
    pub container_api_token: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            reconcile_timeout_secs: DEFAULT_RECONCILE_TIMEOUT_SECS,
            creating_requeue_secs: DEFAULT_CREATING_REQUEUE_SECS,
            deleting_requeue_secs: DEFAULT_DELETING_REQUEUE_SECS,
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            backoff_min_minutes: DEFAULT_BACKOFF_MIN_MINUTES,
            backoff_max_minutes: DEFAULT_BACKOFF_MAX_MINUTES,
            watch_namespace: String::new(),
            log_level: "INFO".to_string(),
            container_api_endpoint: None,
            container_api_token: None,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            reconcile_timeout_secs: env_var_or_default(
                "RECONCILE_TIMEOUT_SECS",
                DEFAULT_RECONCILE_TIMEOUT_SECS,
            ),
            creating_requeue_secs: env_var_or_default(
                "CREATING_REQUEUE_SECS",
                DEFAULT_CREATING_REQUEUE_SECS,
            ),
            deleting_requeue_secs: env_var_or_default(
                "DELETING_REQUEUE_SECS",
                DEFAULT_DELETING_REQUEUE_SECS,
            ),
            resync_interval_secs: env_var_or_default(
                "RESYNC_INTERVAL_SECS",
                DEFAULT_RESYNC_INTERVAL_SECS,
            ),
            backoff_min_minutes: env_var_or_default(
                "BACKOFF_MIN_MINUTES",
                DEFAULT_BACKOFF_MIN_MINUTES,
            ),
            backoff_max_minutes: env_var_or_default(
                "BACKOFF_MAX_MINUTES",
                DEFAULT_BACKOFF_MAX_MINUTES,
            ),
            watch_namespace: env_var_or_default_str("WATCH_NAMESPACE", ""),
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
            container_api_endpoint: env_var_opt("CONTAINER_API_ENDPOINT"),
            container_api_token: env_var_opt("CONTAINER_API_TOKEN"),
        }
    }

    #[must_use]
    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs)
    }

    #[must_use]
    pub fn creating_requeue(&self) -> Duration {
        Duration::from_secs(self.creating_requeue_secs)
    }

    #[must_use]
    pub fn deleting_requeue(&self) -> Duration {
        Duration::from_secs(self.deleting_requeue_secs)
    }

    #[must_use]
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    /// Namespace to watch, if restricted
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        (!self.watch_namespace.is_empty()).then_some(self.watch_namespace.as_str())
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read a non-empty environment variable
fn env_var_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
