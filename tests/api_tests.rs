//! HTTP API tests driving the router in-process.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use ops_dashboard::clock::Clock;
use ops_dashboard::dashboard::{DashboardServer, build_router};
use ops_dashboard::db::Database;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

const TOKEN: &str = "test-admin-token";

fn test_app(token: Option<&str>) -> Router {
    let clock = Clock::pinned_at("2026-10-12 09:00:00").unwrap();
    let db = Database::open_in_memory().unwrap().with_clock(clock);
    build_router(DashboardServer::new(Arc::new(db), token.map(str::to_string)))
}

/// One request through the router. Returns the status and the JSON body.
async fn send(
    app: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (u16, Value) {
    let mut request = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status().as_u16();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn health_and_root() {
    let app = test_app(None);

    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, "GET", "/api", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["endpoints"]["today"], "/api/today");
}

#[tokio::test]
async fn admin_routes_require_token() {
    let app = test_app(Some(TOKEN));

    let (status, body) = send(&app, "GET", "/api/admin/task-templates", None, None).await;
    assert_eq!(status, 401);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, "GET", "/api/admin/check-auth", Some("wrong"), None).await;
    assert_eq!(status, 401);

    let (status, body) = send(&app, "GET", "/api/admin/check-auth", Some(TOKEN), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["authenticated"], true);
}

#[tokio::test]
async fn admin_closed_without_configured_token() {
    let app = test_app(None);
    let (status, _) = send(&app, "GET", "/api/admin/task-templates", Some(""), None).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn template_lifecycle_over_http() {
    let app = test_app(Some(TOKEN));

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/task-templates",
        Some(TOKEN),
        Some(json!({"name": "Run", "category": "main", "weekdays": "0,2"})),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(body["success"], true);
    assert_eq!(body["template"]["weekdays"], "0,2");
    let id = body["template"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/task-templates",
        Some(TOKEN),
        Some(json!({"task_name": "Run"})),
    )
    .await;
    assert_eq!(status, 409);
    assert_eq!(body["code"], "DUPLICATE_NAME");

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/task-templates",
        Some(TOKEN),
        Some(json!({"name": "Swim", "category": "bonus"})),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_FIELD");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/admin/task-templates/{}", id),
        Some(TOKEN),
        Some(json!({"name": "Jog", "category": "main", "weekdays": "all"})),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["template"]["name"], "Jog");

    let (status, body) = send(&app, "GET", "/api/admin/task-templates", Some(TOKEN), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["templates"].as_array().unwrap().len(), 1);

    // Materialize today so the delete has something pending to remove.
    send(&app, "GET", "/api/today", None, None).await;
    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/admin/task-templates/{}", id),
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["removedInstances"], 1);

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/admin/task-templates/{}", id),
        Some(TOKEN),
        None,
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn toggle_and_views_over_http() {
    let app = test_app(Some(TOKEN));
    send(
        &app,
        "POST",
        "/api/admin/task-templates",
        Some(TOKEN),
        Some(json!({"name": "Run", "category": "main"})),
    )
    .await;

    let (status, today) = send(&app, "GET", "/api/today", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(today["date"], "2026-10-12");
    assert_eq!(today["dayType"], "Math");
    let id = today["mainTasks"][0]["id"].as_i64().unwrap();

    // An empty body completes the task.
    let (status, body) = send(&app, "POST", &format!("/api/task/{}", id), None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["completed"], true);
    assert_eq!(body["completedAt"], "09:00");
    assert_eq!(body["stats"]["isValidCheckin"], true);
    let unlocked: Vec<&str> = body["newAchievements"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|a| a["id"].as_str())
        .collect();
    assert!(unlocked.contains(&"first_blood"));

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/task/{}", id),
        None,
        Some(json!({"completed": false})),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["completed"], false);
    assert!(body["completedAt"].is_null());

    let (status, body) = send(&app, "POST", "/api/task/9999", None, None).await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, week) = send(&app, "GET", "/api/week", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(week["weekData"].as_array().unwrap().len(), 7);
    assert_eq!(week["streak"]["current"], 1);

    let (status, body) = send(&app, "GET", "/api/history/2026-10-13", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["dayType"], "CS");
    assert_eq!(body["tasks"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, "GET", "/api/history/2026-02-30", None, None).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_DATE");

    let (status, body) = send(
        &app,
        "GET",
        "/api/history/range/2026-10-12/2026-10-13",
        None,
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["history"][0]["date"], "2026-10-13");

    let (status, body) = send(&app, "GET", "/api/lifetime", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["lifetime"]["totalTasks"], 0);
    assert_eq!(body["achievements"].as_array().unwrap().len(), 10);

    let (status, body) = send(&app, "GET", "/api/export", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["schemaVersion"], 1);
    assert!(body["tasks"].as_array().unwrap().len() >= 2);
}
