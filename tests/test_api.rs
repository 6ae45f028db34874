//! Tests for the reference store's REST routes.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use taskstate::engine::types::*;
use taskstate::storage::StateStore;
use taskstate::storage::json_store::JsonStateStore;
use taskstate::storage::memory_store::MemoryStateStore;

async fn send(app: &Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let req = match body {
        Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn app_with_group() -> (Router, Arc<MemoryStateStore>) {
    let store = Arc::new(MemoryStateStore::new());
    let mut group = Group::new("g1", "batch", GroupKind::Chain);
    group.tasks.push(Task::new("t1", "fetch"));
    group.tasks.push(Task::new("t2", "parse"));
    store.provision_group(&group).await.unwrap();

    (taskstate::api::router(store.clone()), store)
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _) = app_with_group().await;
    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn get_task_returns_wire_format() {
    let (app, _) = app_with_group().await;
    let (status, body) = send(&app, "GET", "/tasks/t2", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["UUID"], "t2");
    assert_eq!(body["Status"], "PENDING");
    assert_eq!(body["JobUUID"], "g1");
    assert_eq!(body["ExecutionOrder"], 1);
}

#[tokio::test]
async fn put_task_applies_partial_update() {
    let (app, store) = app_with_group().await;

    let (status, body) = send(
        &app,
        "PUT",
        "/tasks/t1",
        Some(serde_json::json!({
            "Status": "SUCCESS",
            "Result": [{ "Type": "string", "Value": "done" }]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Status"], "SUCCESS");
    assert_eq!(body["Name"], "fetch");

    let task = store.get_task("t1").await.unwrap();
    assert_eq!(task.results, vec![TaskResult::new("string", serde_json::json!("done"))]);
}

#[tokio::test]
async fn missing_resources_return_404() {
    let (app, _) = app_with_group().await;

    let (status, body) = send(&app, "GET", "/tasks/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nope"));

    let (status, _) = send(&app, "GET", "/jobs/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "PUT",
        "/tasks/nope",
        Some(serde_json::json!({ "Status": "STARTED" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_job_embeds_tasks_in_order() {
    let (app, _) = app_with_group().await;
    let (status, body) = send(&app, "GET", "/jobs/g1", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Type"], "CHAIN");
    let tasks = body["Tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["UUID"], "t1");
    assert_eq!(tasks[1]["UUID"], "t2");
}

#[tokio::test]
async fn provision_job_assigns_missing_ids() {
    let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
    let app = taskstate::api::router(store);

    let (status, body) = send(
        &app,
        "POST",
        "/jobs",
        Some(serde_json::json!({
            "Name": "nightly",
            "Type": "CHORD",
            "Tasks": [{ "Name": "a" }, { "Name": "b" }]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let job_id = body["UUID"].as_str().unwrap().to_string();
    assert!(!job_id.is_empty());

    let tasks = body["Tasks"].as_array().unwrap();
    assert!(tasks.iter().all(|t| !t["UUID"].as_str().unwrap().is_empty()));
    assert!(tasks.iter().all(|t| t["JobUUID"] == job_id.as_str()));

    let (status, _) = send(&app, "GET", &format!("/jobs/{}", job_id), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn provision_job_rejects_repeated_task_ids() {
    let (app, _) = app_with_group().await;

    let (status, _) = send(
        &app,
        "POST",
        "/jobs",
        Some(serde_json::json!({
            "UUID": "g2",
            "Tasks": [{ "UUID": "x" }, { "UUID": "x" }]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_then_get_is_404() {
    let (app, _) = app_with_group().await;

    let (status, body) = send(&app, "DELETE", "/tasks/t1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], "t1");

    let (status, _) = send(&app, "GET", "/tasks/t1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/tasks/t1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn json_backed_router_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn StateStore> = Arc::new(JsonStateStore::new(dir.path()));
    let app = taskstate::api::router(store);

    let (status, _) = send(
        &app,
        "POST",
        "/tasks",
        Some(serde_json::json!({ "UUID": "solo", "Name": "report" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "PUT",
        "/tasks/solo",
        Some(serde_json::json!({ "Status": "FAILURE", "Error": "no data" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Error"], "no data");
    assert!(body["JobUUID"].is_null());
}
