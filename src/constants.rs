//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

use std::time::Duration;

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Requeue interval for every path that is waiting on GKE to converge
pub const DEFAULT_RETRY_TIME: Duration = Duration::from_secs(30);

/// Default requeue interval while a control plane is being created (seconds)
pub const DEFAULT_CREATING_REQUEUE_SECS: u64 = 300;

/// Default requeue interval while waiting for a deletion to finish (seconds)
pub const DEFAULT_DELETING_REQUEUE_SECS: u64 = 300;

/// Default upper bound for a single reconcile pass (seconds)
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 600;

/// Default requeue interval after a converged pass (seconds)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 600;

/// Fibonacci backoff floor for reconcile errors (minutes)
pub const DEFAULT_BACKOFF_MIN_MINUTES: u64 = 1;

/// Fibonacci backoff ceiling for reconcile errors (minutes)
pub const DEFAULT_BACKOFF_MAX_MINUTES: u64 = 10;

/// GKE Container API base URL
pub const DEFAULT_CONTAINER_API_ENDPOINT: &str = "https://container.googleapis.com";

/// Port of the GKE API server endpoint written to the control plane spec
pub const CONTROL_PLANE_ENDPOINT_PORT: i32 = 443;

/// Cluster API label linking infrastructure objects to their cluster
pub const CLUSTER_NAME_LABEL: &str = "cluster.x-k8s.io/cluster-name";

/// Cluster API annotation that suspends reconciliation
pub const PAUSED_ANNOTATION: &str = "cluster.x-k8s.io/paused";

/// Secret type Cluster API uses for generated kubeconfigs
pub const CLUSTER_SECRET_TYPE: &str = "cluster.x-k8s.io/secret";

pub const CONTROL_PLANE_FINALIZER: &str = "gcpmanagedcontrolplane.infrastructure.cluster.x-k8s.io";
pub const MACHINE_POOL_FINALIZER: &str = "gcpmanagedmachinepool.infrastructure.cluster.x-k8s.io";

/// Field manager for server-side apply and status patches
pub const FIELD_MANAGER: &str = "gke-cluster-controller";
