//! Sidecar inspection routes, exercised as HTTP requests against the router
//! directly (no socket bind needed) via `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceExt;

use graphium::adapters::http::sidecar_api::{self, SidecarApiState};
use graphium::adapters::memory::FakeRuntime;
use graphium::domain::models::ContainerSpec;
use graphium::domain::ports::Runtime;
use graphium::services::agent_runtime::{AgentStats, HandlerContext};

fn router(state: SidecarApiState) -> Router {
    Router::new()
        .route("/health", get(sidecar_api::health))
        .route("/containers", get(sidecar_api::list_containers))
        .route("/containers/:id", get(sidecar_api::inspect_container))
        .route("/containers/:id/logs", get(sidecar_api::container_logs))
        .route("/v1/api/semantic/action", post(sidecar_api::semantic_action))
        .with_state(state)
}

async fn state_with_one_container() -> (SidecarApiState, String) {
    let runtime: Arc<dyn Runtime> = Arc::new(FakeRuntime::new());
    let spec = ContainerSpec {
        name: "web".to_string(),
        image: "nginx:latest".to_string(),
        env: Default::default(),
        ports: Default::default(),
        mounts: Vec::new(),
        healthcheck: None,
        resources: Default::default(),
        depends_on: Vec::new(),
        located_in_host: None,
        restart_policy: None,
    };
    let container_id = runtime.create(&spec).await.unwrap();
    runtime.start(&container_id).await.unwrap();

    let handler_ctx = HandlerContext { runtime: runtime.clone(), log_collection_dir: std::env::temp_dir() };
    let state = SidecarApiState {
        host_id: "host-a".to_string(),
        datacenter: Some("dc1".to_string()),
        runtime,
        stats: Arc::new(AgentStats::new()),
        handler_ctx,
    };
    (state, container_id)
}

#[tokio::test]
async fn health_reports_the_stats_snapshot() {
    let (state, _id) = state_with_one_container().await;
    let app = router(state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn list_and_inspect_containers_round_trip() {
    let (state, container_id) = state_with_one_container().await;
    let app = router(state);

    let list_response = app
        .clone()
        .oneshot(Request::builder().uri("/containers").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(list_response.status(), StatusCode::OK);
    let body = to_bytes(list_response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["containers"].as_array().unwrap().iter().any(|c| c["id"] == container_id));

    let inspect_response = app
        .oneshot(Request::builder().uri(format!("/containers/{container_id}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(inspect_response.status(), StatusCode::OK);
}

#[tokio::test]
async fn inspect_unknown_container_is_not_found() {
    let (state, _id) = state_with_one_container().await;
    let app = router(state);

    let response = app
        .oneshot(Request::builder().uri("/containers/does-not-exist").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_ne!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn non_following_logs_request_returns_the_buffered_slice_immediately() {
    let (state, container_id) = state_with_one_container().await;
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/containers/{container_id}/logs"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("X-Container-ID").unwrap(), &container_id);
    assert_eq!(response.headers().get("X-Host-ID").unwrap(), "host-a");
    // The real `FakeRuntime` container starts with no captured output; the
    // meaningful assertion here is that the non-follow path returns
    // synchronously rather than blocking on the follow-poll interval.
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn logs_strip_the_runtime_framing_header_and_set_no_buffering() {
    let fake = Arc::new(FakeRuntime::new());
    let spec = ContainerSpec {
        name: "web".to_string(),
        image: "nginx:latest".to_string(),
        env: Default::default(),
        ports: Default::default(),
        mounts: Vec::new(),
        healthcheck: None,
        resources: Default::default(),
        depends_on: Vec::new(),
        located_in_host: None,
        restart_policy: None,
    };
    let container_id = fake.create(&spec).await.unwrap();
    fake.start(&container_id).await.unwrap();
    fake.push_logs(&container_id, &[0u8, 0, 0, 0, 0, 0, 0, 12, b'h', b'e', b'l', b'l', b'o', b'!']);

    let handler_ctx = HandlerContext { runtime: fake.clone(), log_collection_dir: std::env::temp_dir() };
    let state = SidecarApiState {
        host_id: "host-a".to_string(),
        datacenter: Some("dc1".to_string()),
        runtime: fake,
        stats: Arc::new(AgentStats::new()),
        handler_ctx,
    };
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/containers/{container_id}/logs"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("X-Accel-Buffering").unwrap(), "no");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"hello!");
}
