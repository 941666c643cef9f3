//! GKE Container API REST client
//!
//! Native REST implementation for the Container API v1, built on reqwest.
//! Authentication uses an access token from the GCE metadata server
//! (Workload Identity) that is cached until shortly before it expires.
//!
//! Setting an endpoint override switches the client to a static token,
//! which is how local fake servers and tests talk to it.
//!
//! References:
//! - [Container API v1 REST reference](https://cloud.google.com/kubernetes-engine/docs/reference/rest)

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, info_span, warn, Instrument, Span};

use super::client::{CloudError, ClusterClient, NodePoolClient};
use super::model::{
    Cluster, CreateClusterRequest, CreateNodePoolRequest, NodePool, Operation,
    SetMaintenancePolicyRequest, SetNodePoolSizeRequest, UpdateClusterRequest,
    UpdateNodePoolRequest,
};
use crate::constants::DEFAULT_CONTAINER_API_ENDPOINT;
use crate::observability::metrics;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Tokens are refreshed this long before they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct GcpErrorResponse {
    error: GcpError,
}

#[derive(Debug, Deserialize)]
struct GcpError {
    code: u16,
    message: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// GKE Container API REST client
pub struct ContainerREST {
    http_client: Client,
    base_url: String,
    static_token: Option<String>,
    metadata_token_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for ContainerREST {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerREST")
            .field("base_url", &self.base_url)
            .field("static_token", &self.static_token.is_some())
            .finish_non_exhaustive()
    }
}

impl ContainerREST {
    /// Build a client.
    ///
    /// `endpoint` overrides the public API endpoint; `token` replaces the
    /// metadata server token.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError::Transport`] when the HTTP client cannot be built.
    pub fn new(endpoint: Option<String>, token: Option<String>) -> Result<Self, CloudError> {
        let base_url = endpoint
            .unwrap_or_else(|| DEFAULT_CONTAINER_API_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();

        info!("Initializing GKE REST client for endpoint: {}", base_url);
        if token.is_some() {
            info!("Using static access token for GKE API");
        } else {
            info!("Using Workload Identity authentication (metadata server)");
        }

        let http_client = Client::builder()
            .build()
            .map_err(|e| CloudError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url,
            static_token: token,
            metadata_token_url: METADATA_TOKEN_URL.to_string(),
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, CloudError> {
        if let Some(token) = &self.static_token {
            return Ok(token.clone());
        }

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .http_client
            .get(&self.metadata_token_url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| CloudError::Auth(format!("metadata server not available: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!("Metadata server returned status {}: {}", status, body);
            return Err(CloudError::Auth(format!(
                "metadata server returned {status}; ensure Workload Identity is enabled"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CloudError::Auth(format!("failed to parse token response: {e}")))?;
        debug!("Retrieved access token from metadata server");

        match token_expiry(token.expires_in) {
            Some(expires_at) => {
                *cached = Some(CachedToken {
                    value: token.access_token.clone(),
                    expires_at,
                });
            }
            None => {
                debug!(expires_in = token.expires_in, "Token lifetime out of range, not caching");
                *cached = None;
            }
        }
        Ok(token.access_token)
    }

    async fn make_request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::RequestBuilder, CloudError> {
        let url = format!("{}/v1/{}", self.base_url, path);
        let token = self.access_token().await?;
        let auth_header = if token.starts_with("Bearer ") {
            token
        } else {
            format!("Bearer {token}")
        };

        let mut request = self
            .http_client
            .request(method, &url)
            .header("Authorization", auth_header)
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            request = request.json(&body);
        }
        Ok(request)
    }

    /// Map a non-success response to a [`CloudError`].
    #[must_use]
    pub fn handle_error_response(status: StatusCode, error_text: &str) -> CloudError {
        if status == StatusCode::NOT_FOUND {
            return CloudError::NotFound;
        }
        match serde_json::from_str::<GcpErrorResponse>(error_text) {
            Ok(error_response) => CloudError::Api {
                code: error_response.error.code,
                status: error_response.error.status,
                message: error_response.error.message,
            },
            Err(_) => CloudError::Api {
                code: status.as_u16(),
                status: status
                    .canonical_reason()
                    .unwrap_or_default()
                    .to_string(),
                message: error_text.to_string(),
            },
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, CloudError> {
        let span = info_span!(
            "gke.api",
            operation = operation,
            resource = path,
            operation.success = tracing::field::Empty,
            operation.duration_ms = tracing::field::Empty,
        );
        let tracker = OperationTracker::new(operation, span.clone());

        async move {
            let response = self
                .make_request(method, path, body)
                .await
                .map_err(|e| tracker.fail(e))?
                .send()
                .await
                .map_err(|e| tracker.fail(CloudError::Transport(e.to_string())))?;

            let status = response.status();
            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                let error = Self::handle_error_response(status, &error_text);
                if error.is_not_found() {
                    debug!("{} returned not found", operation);
                    tracker.record_success();
                    return Err(error);
                }
                warn!("{} failed: {}", operation, error);
                return Err(tracker.fail(error));
            }

            let value = response
                .json::<T>()
                .await
                .map_err(|e| tracker.fail(CloudError::Decode(e.to_string())))?;
            tracker.record_success();
            Ok(value)
        }
        .instrument(span)
        .await
    }

    fn to_body<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, CloudError> {
        serde_json::to_value(value).map_err(|e| CloudError::Decode(e.to_string()))
    }
}

/// Instant a freshly issued token expires, if representable.
fn token_expiry(expires_in: u64) -> Option<Instant> {
    Instant::now().checked_add(Duration::from_secs(expires_in))
}

/// Times one API call and records its outcome.
struct OperationTracker {
    operation: &'static str,
    start: Instant,
    span: Span,
}

impl OperationTracker {
    fn new(operation: &'static str, span: Span) -> Self {
        Self {
            operation,
            start: Instant::now(),
            span,
        }
    }

    fn record_success(&self) {
        let elapsed = self.start.elapsed();
        self.span.record("operation.success", true);
        self.span
            .record("operation.duration_ms", u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        metrics::record_gke_operation(self.operation, elapsed.as_secs_f64());
    }

    fn fail(&self, error: CloudError) -> CloudError {
        let elapsed = self.start.elapsed();
        self.span.record("operation.success", false);
        self.span
            .record("operation.duration_ms", u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        metrics::increment_gke_operation_errors(self.operation);
        error
    }
}

#[async_trait]
impl ClusterClient for ContainerREST {
    async fn get_cluster(&self, name: &str) -> Result<Cluster, CloudError> {
        self.call("get_cluster", Method::GET, name, None).await
    }

    async fn create_cluster(&self, request: CreateClusterRequest) -> Result<Operation, CloudError> {
        let path = format!("{}/clusters", request.parent);
        let body = Self::to_body(&request)?;
        self.call("create_cluster", Method::POST, &path, Some(body))
            .await
    }

    async fn update_cluster(&self, request: UpdateClusterRequest) -> Result<Operation, CloudError> {
        let body = Self::to_body(&request)?;
        self.call("update_cluster", Method::PUT, &request.name, Some(body))
            .await
    }

    async fn delete_cluster(&self, name: &str) -> Result<Operation, CloudError> {
        self.call("delete_cluster", Method::DELETE, name, None).await
    }

    async fn set_maintenance_policy(
        &self,
        request: SetMaintenancePolicyRequest,
    ) -> Result<Operation, CloudError> {
        let path = format!("{}:setMaintenancePolicy", request.name);
        let body = Self::to_body(&request)?;
        self.call("set_maintenance_policy", Method::POST, &path, Some(body))
            .await
    }
}

#[async_trait]
impl NodePoolClient for ContainerREST {
    async fn get_node_pool(&self, name: &str) -> Result<NodePool, CloudError> {
        self.call("get_node_pool", Method::GET, name, None).await
    }

    async fn create_node_pool(
        &self,
        request: CreateNodePoolRequest,
    ) -> Result<Operation, CloudError> {
        let path = format!("{}/nodePools", request.parent);
        let body = Self::to_body(&request)?;
        self.call("create_node_pool", Method::POST, &path, Some(body))
            .await
    }

    async fn update_node_pool(
        &self,
        request: UpdateNodePoolRequest,
    ) -> Result<Operation, CloudError> {
        let body = Self::to_body(&request)?;
        self.call("update_node_pool", Method::PUT, &request.name, Some(body))
            .await
    }

    async fn set_node_pool_size(
        &self,
        request: SetNodePoolSizeRequest,
    ) -> Result<Operation, CloudError> {
        let path = format!("{}:setSize", request.name);
        let body = Self::to_body(&request)?;
        self.call("set_node_pool_size", Method::POST, &path, Some(body))
            .await
    }

    async fn delete_node_pool(&self, name: &str) -> Result<Operation, CloudError> {
        self.call("delete_node_pool", Method::DELETE, name, None).await
    }
}
