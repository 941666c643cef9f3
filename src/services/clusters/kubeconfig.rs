//! Kubeconfig Secret for a running cluster.
//!
//! Cluster API consumers read `{cluster}-kubeconfig` from the control plane
//! namespace. Credentials come from `gke-gcloud-auth-plugin` at use time, so
//! the Secret holds no token.

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use serde_json::json;

use crate::constants::{CLUSTER_NAME_LABEL, CLUSTER_SECRET_TYPE, FIELD_MANAGER};

/// Key holding the kubeconfig inside the Secret.
pub const KUBECONFIG_SECRET_KEY: &str = "value";

/// Inputs of a rendered kubeconfig.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeconfigSpec {
    /// Cluster API cluster name, used for the Secret and context names
    pub cluster: String,
    pub namespace: String,
    /// Host or IP of the GKE API server
    pub endpoint: String,
    /// Base64 PEM as reported in `masterAuth.clusterCaCertificate`
    pub ca_data: String,
}

impl KubeconfigSpec {
    #[must_use]
    pub fn secret_name(&self) -> String {
        format!("{}-kubeconfig", self.cluster)
    }
}

/// Render the kubeconfig YAML.
///
/// # Errors
///
/// Fails only if YAML serialization fails.
pub fn render_kubeconfig(spec: &KubeconfigSpec) -> Result<String, serde_yaml::Error> {
    let context = format!("{}-{}", spec.namespace, spec.cluster);
    let mut cluster = json!({ "server": format!("https://{}", spec.endpoint) });
    if !spec.ca_data.is_empty() {
        cluster["certificate-authority-data"] = json!(spec.ca_data);
    }

    serde_yaml::to_string(&json!({
        "apiVersion": "v1",
        "kind": "Config",
        "clusters": [{ "name": context, "cluster": cluster }],
        "users": [{
            "name": context,
            "user": {
                "exec": {
                    "apiVersion": "client.authentication.k8s.io/v1beta1",
                    "command": "gke-gcloud-auth-plugin",
                    "installHint": "Install gke-gcloud-auth-plugin for use with kubectl by following https://cloud.google.com/kubernetes-engine/docs/how-to/cluster-access-for-kubectl#install_plugin",
                    "provideClusterInfo": true,
                    "interactiveMode": "IfAvailable"
                }
            }
        }],
        "contexts": [{
            "name": context,
            "context": { "cluster": context, "user": context }
        }],
        "current-context": context,
    }))
}

/// Writes the kubeconfig Secret for a cluster.
#[async_trait]
pub trait KubeconfigWriter: Send + Sync {
    async fn write_kubeconfig(&self, spec: &KubeconfigSpec, kubeconfig: String)
        -> Result<(), kube::Error>;
}

/// [`KubeconfigWriter`] that server-side applies the Secret.
#[derive(Clone)]
pub struct SecretKubeconfigWriter {
    client: Client,
}

impl Debug for SecretKubeconfigWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKubeconfigWriter").finish_non_exhaustive()
    }
}

impl SecretKubeconfigWriter {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Secret carrying the kubeconfig under [`KUBECONFIG_SECRET_KEY`].
#[must_use]
pub fn kubeconfig_secret(spec: &KubeconfigSpec, kubeconfig: String) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(spec.secret_name()),
            namespace: Some(spec.namespace.clone()),
            labels: Some(BTreeMap::from([(
                CLUSTER_NAME_LABEL.to_string(),
                spec.cluster.clone(),
            )])),
            ..ObjectMeta::default()
        },
        type_: Some(CLUSTER_SECRET_TYPE.to_string()),
        data: Some(BTreeMap::from([(
            KUBECONFIG_SECRET_KEY.to_string(),
            ByteString(kubeconfig.into_bytes()),
        )])),
        ..Secret::default()
    }
}

#[async_trait]
impl KubeconfigWriter for SecretKubeconfigWriter {
    async fn write_kubeconfig(
        &self,
        spec: &KubeconfigSpec,
        kubeconfig: String,
    ) -> Result<(), kube::Error> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &spec.namespace);
        let secret = kubeconfig_secret(spec, kubeconfig);
        // Server-side apply requires type metadata in the body.
        let mut body = serde_json::to_value(&secret).map_err(kube::Error::SerdeError)?;
        body["apiVersion"] = json!("v1");
        body["kind"] = json!("Secret");
        api.patch(
            &spec.secret_name(),
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&body),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> KubeconfigSpec {
        KubeconfigSpec {
            cluster: "prod".to_string(),
            namespace: "capi".to_string(),
            endpoint: "34.1.2.3".to_string(),
            ca_data: "Q0FEQVRB".to_string(),
        }
    }

    #[test]
    fn test_render_kubeconfig() {
        let yaml = render_kubeconfig(&spec()).unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(parsed["current-context"].as_str(), Some("capi-prod"));
        assert_eq!(
            parsed["clusters"][0]["cluster"]["server"].as_str(),
            Some("https://34.1.2.3")
        );
        assert_eq!(
            parsed["clusters"][0]["cluster"]["certificate-authority-data"].as_str(),
            Some("Q0FEQVRB")
        );
        assert_eq!(
            parsed["users"][0]["user"]["exec"]["command"].as_str(),
            Some("gke-gcloud-auth-plugin")
        );
    }

    #[test]
    fn test_missing_ca_is_omitted() {
        let mut spec = spec();
        spec.ca_data = String::new();
        let yaml = render_kubeconfig(&spec).unwrap();
        assert!(!yaml.contains("certificate-authority-data"));
    }

    #[test]
    fn test_secret_shape() {
        let secret = kubeconfig_secret(&spec(), "kubeconfig".to_string());
        assert_eq!(secret.metadata.name.as_deref(), Some("prod-kubeconfig"));
        assert_eq!(secret.type_.as_deref(), Some("cluster.x-k8s.io/secret"));
        assert_eq!(
            secret.metadata.labels.unwrap().get(CLUSTER_NAME_LABEL).map(String::as_str),
            Some("prod")
        );
        assert_eq!(
            secret.data.unwrap().get(KUBECONFIG_SECRET_KEY),
            Some(&ByteString(b"kubeconfig".to_vec()))
        );
    }
}
