//! REST client behaviour against a fake Container API served by axum.

mod common;

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};

use gke_cluster_controller::container::model::{
    Channel, ClusterStatus, ClusterUpdate, CreateNodePoolRequest, NodePool, ReleaseChannel,
    SetNodePoolSizeRequest, UpdateClusterRequest,
};
use gke_cluster_controller::container::{CloudError, ClusterClient, ContainerREST, NodePoolClient};

const CLUSTERS: &str = "projects/my-project/locations/europe-west2/clusters";

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    authorization: Option<String>,
    body: String,
}

#[derive(Debug, Clone, Default)]
struct FakeGke {
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeGke {
    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

fn gcp_error(code: u16, status: &str, message: &str) -> Value {
    json!({ "error": { "code": code, "status": status, "message": message } })
}

async fn handle(
    State(fake): State<FakeGke>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let path = uri.path().to_string();
    fake.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string),
        body,
    });

    match (method, path.rsplit('/').next().unwrap_or_default()) {
        (Method::GET, "present") => Json(json!({
            "name": "present",
            "status": "RUNNING",
            "endpoint": "34.89.10.20",
            "masterAuth": { "clusterCaCertificate": "Q0E=" },
            "autoscaling": { "enableNodeAutoprovisioning": false }
        }))
        .into_response(),
        (Method::GET, "suspended") => {
            Json(json!({ "name": "suspended", "status": "SUSPENDED" })).into_response()
        }
        (Method::GET, "missing") => (
            StatusCode::NOT_FOUND,
            Json(gcp_error(404, "NOT_FOUND", "cluster not found")),
        )
            .into_response(),
        (Method::GET, "flaky") => (StatusCode::BAD_GATEWAY, "upstream unavailable").into_response(),
        (Method::GET, "garbled") => (StatusCode::OK, "not json").into_response(),
        (Method::PUT, "busy") => (
            StatusCode::BAD_REQUEST,
            Json(gcp_error(
                400,
                "FAILED_PRECONDITION",
                "Cluster is running incompatible operation",
            )),
        )
            .into_response(),
        _ => Json(json!({
            "name": "operation-7",
            "operationType": "UPDATE_CLUSTER",
            "status": "RUNNING"
        }))
        .into_response(),
    }
}

async fn start_fake_gke() -> (ContainerREST, FakeGke) {
    common::init_rustls();
    let fake = FakeGke::default();
    let app = Router::new().fallback(handle).with_state(fake.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client =
        ContainerREST::new(Some(format!("http://{addr}/")), Some("test-token".to_string()))
            .unwrap();
    (client, fake)
}

#[tokio::test]
async fn test_get_cluster_decodes_and_authenticates() {
    let (client, fake) = start_fake_gke().await;

    let cluster = client
        .get_cluster(&format!("{CLUSTERS}/present"))
        .await
        .unwrap();

    assert_eq!(cluster.name, "present");
    assert_eq!(cluster.status, ClusterStatus::Running);
    assert_eq!(cluster.endpoint, "34.89.10.20");
    assert_eq!(
        cluster.master_auth.map(|a| a.cluster_ca_certificate),
        Some("Q0E=".to_string())
    );

    let requests = fake.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::GET);
    assert_eq!(requests[0].path, format!("/v1/{CLUSTERS}/present"));
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer test-token"));
}

#[tokio::test]
async fn test_unknown_cluster_status_is_kept() {
    let (client, _fake) = start_fake_gke().await;

    let cluster = client
        .get_cluster(&format!("{CLUSTERS}/suspended"))
        .await
        .unwrap();

    assert_eq!(cluster.status, ClusterStatus::Other("SUSPENDED".to_string()));
}

#[tokio::test]
async fn test_missing_cluster_is_not_found() {
    let (client, _fake) = start_fake_gke().await;

    let error = client
        .get_cluster(&format!("{CLUSTERS}/missing"))
        .await
        .unwrap_err();

    assert!(error.is_not_found());
}

#[tokio::test]
async fn test_error_bodies_map_to_api_errors() {
    let (client, _fake) = start_fake_gke().await;

    let error = client
        .update_cluster(UpdateClusterRequest {
            name: format!("{CLUSTERS}/busy"),
            update: ClusterUpdate::default(),
        })
        .await
        .unwrap_err();
    assert_eq!(
        error,
        CloudError::Api {
            code: 400,
            status: "FAILED_PRECONDITION".to_string(),
            message: "Cluster is running incompatible operation".to_string(),
        }
    );

    let error = client
        .get_cluster(&format!("{CLUSTERS}/flaky"))
        .await
        .unwrap_err();
    assert!(matches!(error, CloudError::Api { code: 502, .. }));
}

#[tokio::test]
async fn test_undecodable_success_body_is_decode_error() {
    let (client, _fake) = start_fake_gke().await;

    let error = client
        .get_cluster(&format!("{CLUSTERS}/garbled"))
        .await
        .unwrap_err();

    assert!(matches!(error, CloudError::Decode(_)));
}

#[tokio::test]
async fn test_update_cluster_puts_single_field() {
    let (client, fake) = start_fake_gke().await;

    let operation = client
        .update_cluster(UpdateClusterRequest {
            name: format!("{CLUSTERS}/present"),
            update: ClusterUpdate {
                desired_release_channel: Some(ReleaseChannel {
                    channel: Channel::Stable,
                }),
                ..ClusterUpdate::default()
            },
        })
        .await
        .unwrap();
    assert_eq!(operation.name, "operation-7");

    let requests = fake.requests();
    assert_eq!(requests[0].method, Method::PUT);
    assert_eq!(requests[0].path, format!("/v1/{CLUSTERS}/present"));
    let body: Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(
        body["update"],
        json!({ "desiredReleaseChannel": { "channel": "STABLE" } })
    );
}

#[tokio::test]
async fn test_node_pool_routes() {
    let (client, fake) = start_fake_gke().await;
    let cluster = format!("{CLUSTERS}/present");
    let pool = format!("{cluster}/nodePools/pool-0");

    client
        .create_node_pool(CreateNodePoolRequest {
            parent: cluster.clone(),
            node_pool: NodePool {
                name: "pool-0".to_string(),
                initial_node_count: 2,
                ..NodePool::default()
            },
        })
        .await
        .unwrap();
    client
        .set_node_pool_size(SetNodePoolSizeRequest {
            name: pool.clone(),
            node_count: 5,
        })
        .await
        .unwrap();
    client.delete_node_pool(&pool).await.unwrap();

    let requests = fake.requests();
    let routes: Vec<(Method, String)> = requests
        .iter()
        .map(|r| (r.method.clone(), r.path.clone()))
        .collect();
    assert_eq!(
        routes,
        vec![
            (Method::POST, format!("/v1/{cluster}/nodePools")),
            (Method::POST, format!("/v1/{pool}:setSize")),
            (Method::DELETE, format!("/v1/{pool}")),
        ]
    );

    let create: Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(create["nodePool"]["name"], "pool-0");
    assert_eq!(create["nodePool"]["initialNodeCount"], 2);
    let resize: Value = serde_json::from_str(&requests[1].body).unwrap();
    assert_eq!(resize["nodeCount"], 5);
    assert!(requests[2].body.is_empty());
}
