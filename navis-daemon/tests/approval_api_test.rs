//! Approval workflow API tests over signed requests.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, signed_request, TestApp};
use navis_daemon::services::IssuedDevice;
use serde_json::json;
use tower::ServiceExt;

async fn post_json(
    app: &TestApp,
    device: &IssuedDevice,
    path: &str,
    body: serde_json::Value,
) -> axum::response::Response {
    let bytes = serde_json::to_vec(&body).unwrap();
    let req = signed_request(
        &device.device.id,
        &device.raw_secret,
        Method::POST,
        path,
        &bytes,
    );
    app.router.clone().oneshot(req).await.unwrap()
}

async fn get(app: &TestApp, device: &IssuedDevice, path: &str) -> axum::response::Response {
    let req = signed_request(
        &device.device.id,
        &device.raw_secret,
        Method::GET,
        path,
        b"",
    );
    app.router.clone().oneshot(req).await.unwrap()
}

#[tokio::test]
async fn create_approval_persists_pending_request() {
    let app = TestApp::spawn();
    let device = app.pair_device("Pixel 9").await;

    let response = post_json(
        &app,
        &device,
        "/api/approvals",
        json!({"type": "terminal_command", "payload": {"command": "make deploy"}}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["auto_approved"], false);
    assert_eq!(body["approval"]["status"], "pending");
    assert_eq!(body["approval"]["type"], "terminal_command");
}

#[tokio::test]
async fn safe_command_is_auto_approved() {
    let app = TestApp::spawn();
    let device = app.pair_device("Pixel 9").await;

    let response = post_json(
        &app,
        &device,
        "/api/approvals",
        json!({"type": "terminal_command", "payload": {"command": "git status"}}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["auto_approved"], true);
    assert_eq!(body["approval"]["status"], "approved");

    // synthetic approvals never show up in the pending list
    let response = get(&app, &device, "/api/approvals/pending").await;
    let body = response_json(response).await;
    assert_eq!(body["approvals"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn dangerous_command_is_not_auto_approved() {
    let app = TestApp::spawn();
    let device = app.pair_device("Pixel 9").await;

    let response = post_json(
        &app,
        &device,
        "/api/approvals",
        json!({"type": "terminal_command", "payload": {"command": "git status && rm -rf /"}}),
    )
    .await;

    let body = response_json(response).await;
    assert_eq!(body["auto_approved"], false);
    assert_eq!(body["approval"]["status"], "pending");
}

#[tokio::test]
async fn sensitive_path_is_never_auto_approved() {
    let app = TestApp::spawn();
    let device = app.pair_device("Pixel 9").await;

    let response = post_json(
        &app,
        &device,
        "/api/approvals",
        json!({"type": "file_operation", "payload": {"path": "/etc/passwd"}}),
    )
    .await;

    let body = response_json(response).await;
    assert_eq!(body["auto_approved"], false);
}

#[tokio::test]
async fn resolve_approves_pending_request() {
    let app = TestApp::spawn();
    let device = app.pair_device("Pixel 9").await;

    let response = post_json(
        &app,
        &device,
        "/api/approvals",
        json!({"type": "terminal_command", "payload": {"command": "make deploy"}}),
    )
    .await;
    let body = response_json(response).await;
    let id = body["approval"]["id"].as_str().unwrap().to_string();

    let response = post_json(
        &app,
        &device,
        &format!("/api/approvals/{}/resolve", id),
        json!({"action": "approve", "user_id": "user-1", "reason": "fine"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "approved");
    assert_eq!(body["payload"]["resolution"]["resolved_by"], "user-1");
    assert_eq!(body["payload"]["resolution"]["reason"], "fine");
}

#[tokio::test]
async fn second_resolution_conflicts() {
    let app = TestApp::spawn();
    let device = app.pair_device("Pixel 9").await;

    let response = post_json(
        &app,
        &device,
        "/api/approvals",
        json!({"type": "terminal_command", "payload": {"command": "make deploy"}}),
    )
    .await;
    let body = response_json(response).await;
    let id = body["approval"]["id"].as_str().unwrap().to_string();

    let path = format!("/api/approvals/{}/resolve", id);
    let response = post_json(&app, &device, &path, json!({"action": "deny"})).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(&app, &device, &path, json!({"action": "approve"})).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn resolving_unknown_approval_is_not_found() {
    let app = TestApp::spawn();
    let device = app.pair_device("Pixel 9").await;

    let response = post_json(
        &app,
        &device,
        "/api/approvals/ghost/resolve",
        json!({"action": "approve"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pending_list_supports_type_filter_and_limit() {
    let app = TestApp::spawn();
    let device = app.pair_device("Pixel 9").await;

    post_json(
        &app,
        &device,
        "/api/approvals",
        json!({"type": "terminal_command", "payload": {"command": "make deploy"}}),
    )
    .await;
    post_json(
        &app,
        &device,
        "/api/approvals",
        json!({"type": "network_operation", "payload": {"host": "example.com"}}),
    )
    .await;

    let response = get(&app, &device, "/api/approvals/pending?type=network_operation").await;
    let body = response_json(response).await;
    let approvals = body["approvals"].as_array().unwrap();
    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0]["type"], "network_operation");

    let response = get(&app, &device, "/api/approvals/pending?limit=1").await;
    let body = response_json(response).await;
    assert_eq!(body["approvals"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn batch_resolve_reports_each_outcome() {
    let app = TestApp::spawn();
    let device = app.pair_device("Pixel 9").await;

    let response = post_json(
        &app,
        &device,
        "/api/approvals",
        json!({"type": "terminal_command", "payload": {"command": "make deploy"}}),
    )
    .await;
    let body = response_json(response).await;
    let id = body["approval"]["id"].as_str().unwrap().to_string();

    let response = post_json(
        &app,
        &device,
        "/api/approvals/batch",
        json!({"ids": [id, "ghost"], "action": "approve"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["ok"], true);
    assert_eq!(results[0]["status"], "approved");
    assert_eq!(results[1]["ok"], false);
}

#[tokio::test]
async fn stats_reflect_resolutions() {
    let app = TestApp::spawn();
    let device = app.pair_device("Pixel 9").await;

    let response = post_json(
        &app,
        &device,
        "/api/approvals",
        json!({"type": "terminal_command", "payload": {"command": "make deploy"}}),
    )
    .await;
    let body = response_json(response).await;
    let id = body["approval"]["id"].as_str().unwrap().to_string();
    post_json(
        &app,
        &device,
        &format!("/api/approvals/{}/resolve", id),
        json!({"action": "deny"}),
    )
    .await;

    let response = get(&app, &device, "/api/approvals/stats").await;
    let body = response_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["denied"], 1);
    assert_eq!(body["pending"], 0);
    assert_eq!(body["by_type"]["terminal_command"], 1);
}

#[tokio::test]
async fn revoke_device_over_http_then_reject_it() {
    let app = TestApp::spawn();
    let admin = app.pair_device("Laptop").await;
    let target = app.pair_device("Old phone").await;

    let req = signed_request(
        &admin.device.id,
        &admin.raw_secret,
        Method::DELETE,
        &format!("/api/devices/{}", target.device.id),
        b"",
    );
    let response = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["revoked"], true);

    // the revoked device can no longer authenticate
    let req = signed_request(
        &target.device.id,
        &target.raw_secret,
        Method::GET,
        "/api/devices",
        b"",
    );
    let response = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
