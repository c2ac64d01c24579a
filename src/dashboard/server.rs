//! HTTP server for the dashboard JSON API.
//!
//! Handlers are thin: each one runs a single `Database` operation on the
//! blocking pool and maps `TrackerError` to a status code and JSON body.

use axum::{
    Router,
    body::Bytes,
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::db::Database;
use crate::db::export::ExportBundle;
use crate::error::{TrackerError, TrackerResult};
use crate::types::{
    HistoryDay, HistoryRange, TaskTemplate, TemplateInput, TodaySnapshot, ToggleOutcome,
    WeekSnapshot,
};

/// Dashboard server state shared across handlers.
#[derive(Clone)]
pub struct DashboardServer {
    db: Arc<Database>,
    /// Bearer token for admin routes. `None` refuses every admin request.
    admin_token: Option<Arc<str>>,
}

impl DashboardServer {
    pub fn new(db: Arc<Database>, admin_token: Option<String>) -> Self {
        Self {
            db,
            admin_token: admin_token.filter(|t| !t.is_empty()).map(Arc::from),
        }
    }

    /// True when the request carries the configured admin token.
    pub fn is_admin(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = self.admin_token.as_deref() else {
            return false;
        };
        presented_token(headers).is_some_and(|given| tokens_match(given, expected))
    }

    /// Run a database operation off the async runtime.
    async fn run<T, F>(&self, f: F) -> TrackerResult<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| TrackerError::Internal(format!("worker task failed: {}", e)))?
            .map_err(TrackerError::from)
    }
}

/// `Authorization: Bearer <t>` or `X-Admin-Token: <t>`.
fn presented_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);
    bearer.or_else(|| {
        headers
            .get("x-admin-token")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
    })
}

/// Length-then-content comparison that does not stop at the first mismatch.
fn tokens_match(given: &str, expected: &str) -> bool {
    given.len() == expected.len()
        && given
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code().http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            warn!(code = ?self.code(), error = %self, "Request failed");
        }
        (status, Json(self.to_body())).into_response()
    }
}

/// Success envelope for mutations: `{"success": true, ...body}`.
#[derive(Serialize)]
struct Ack<T: Serialize> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

fn ack<T: Serialize>(body: T) -> Json<Ack<T>> {
    Json(Ack {
        success: true,
        body,
    })
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Toggle request body. An empty body means "complete".
#[derive(Debug, Deserialize)]
struct ToggleRequest {
    #[serde(default = "default_completed")]
    completed: bool,
}

fn default_completed() -> bool {
    true
}

impl Default for ToggleRequest {
    fn default() -> Self {
        Self {
            completed: default_completed(),
        }
    }
}

/// Template create/update body.
#[derive(Debug, Deserialize)]
struct TemplateRequest {
    #[serde(default, alias = "task_name")]
    name: String,
    #[serde(default = "default_category", alias = "task_category")]
    category: String,
    #[serde(default = "default_weekdays")]
    weekdays: String,
}

fn default_category() -> String {
    "optional".to_string()
}

fn default_weekdays() -> String {
    "all".to_string()
}

impl TemplateRequest {
    fn into_input(self) -> TrackerResult<TemplateInput> {
        TemplateInput::parse(&self.name, &self.category, &self.weekdays)
    }
}

/// Parse an optional JSON body, falling back to the default when empty.
fn parse_body<T: for<'de> Deserialize<'de> + Default>(body: &Bytes) -> TrackerResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| TrackerError::invalid_field("body", e.to_string()))
}

fn parse_required_body<T: for<'de> Deserialize<'de>>(body: &Bytes) -> TrackerResult<T> {
    serde_json::from_slice(body).map_err(|e| TrackerError::invalid_field("body", e.to_string()))
}

#[derive(Serialize)]
struct TemplateList {
    templates: Vec<TaskTemplate>,
}

#[derive(Serialize)]
struct TemplateResponse {
    template: TaskTemplate,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteResponse {
    template_id: i64,
    removed_instances: usize,
}

// =============================================================================
// Tracker routes
// =============================================================================

async fn api_today(State(state): State<DashboardServer>) -> TrackerResult<Json<TodaySnapshot>> {
    state.run(|db| db.today_snapshot()).await.map(Json)
}

async fn api_toggle_task(
    State(state): State<DashboardServer>,
    Path(task_id): Path<i64>,
    body: Bytes,
) -> TrackerResult<Json<Ack<ToggleOutcome>>> {
    let request: ToggleRequest = parse_body(&body)?;
    state
        .run(move |db| db.toggle_task(task_id, request.completed))
        .await
        .map(ack)
}

async fn api_week(State(state): State<DashboardServer>) -> TrackerResult<Json<WeekSnapshot>> {
    state.run(|db| db.week_snapshot()).await.map(Json)
}

async fn api_history(
    State(state): State<DashboardServer>,
    Path(date): Path<String>,
) -> TrackerResult<Json<HistoryDay>> {
    state.run(move |db| db.history(&date)).await.map(Json)
}

async fn api_history_range(
    State(state): State<DashboardServer>,
    Path((start, end)): Path<(String, String)>,
) -> TrackerResult<Json<HistoryRange>> {
    state
        .run(move |db| db.history_range(&start, &end))
        .await
        .map(Json)
}

async fn api_lifetime(
    State(state): State<DashboardServer>,
) -> TrackerResult<Json<serde_json::Value>> {
    let (lifetime, achievements) = state
        .run(|db| Ok((db.get_lifetime()?, db.list_achievements()?)))
        .await?;
    Ok(Json(serde_json::json!({
        "lifetime": lifetime,
        "achievements": achievements,
    })))
}

async fn api_achievements(
    State(state): State<DashboardServer>,
) -> TrackerResult<Json<serde_json::Value>> {
    let achievements = state.run(|db| db.list_achievements()).await?;
    Ok(Json(serde_json::json!({ "achievements": achievements })))
}

async fn api_export(State(state): State<DashboardServer>) -> TrackerResult<Json<ExportBundle>> {
    state.run(|db| db.export_all()).await.map(Json)
}

// =============================================================================
// Admin routes
// =============================================================================

/// Gate for the admin sub-router.
async fn require_admin(
    State(state): State<DashboardServer>,
    request: Request,
    next: Next,
) -> Response {
    if state.is_admin(request.headers()) {
        next.run(request).await
    } else {
        info!(path = %request.uri().path(), "Admin request refused");
        TrackerError::Unauthorized.into_response()
    }
}

async fn api_check_auth() -> impl IntoResponse {
    Json(serde_json::json!({ "authenticated": true }))
}

async fn api_list_templates(
    State(state): State<DashboardServer>,
) -> TrackerResult<Json<TemplateList>> {
    let templates = state.run(|db| db.list_templates(None)).await?;
    Ok(Json(TemplateList { templates }))
}

async fn api_create_template(
    State(state): State<DashboardServer>,
    body: Bytes,
) -> TrackerResult<(StatusCode, Json<Ack<TemplateResponse>>)> {
    let input = parse_required_body::<TemplateRequest>(&body)?.into_input()?;
    let template = state.run(move |db| db.create_template(&input)).await?;
    Ok((StatusCode::CREATED, ack(TemplateResponse { template })))
}

async fn api_update_template(
    State(state): State<DashboardServer>,
    Path(template_id): Path<i64>,
    body: Bytes,
) -> TrackerResult<Json<Ack<TemplateResponse>>> {
    let input = parse_required_body::<TemplateRequest>(&body)?.into_input()?;
    let template = state
        .run(move |db| db.update_template(template_id, &input))
        .await?;
    Ok(ack(TemplateResponse { template }))
}

async fn api_delete_template(
    State(state): State<DashboardServer>,
    Path(template_id): Path<i64>,
) -> TrackerResult<Json<Ack<DeleteResponse>>> {
    let removed_instances = state.run(move |db| db.delete_template(template_id)).await?;
    Ok(ack(DeleteResponse {
        template_id,
        removed_instances,
    }))
}

// =============================================================================
// Ambient routes
// =============================================================================

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// API root - returns available endpoints.
async fn api_root() -> impl IntoResponse {
    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/api/health",
            "today": "/api/today",
            "toggle": "POST /api/task/{id}",
            "week": "/api/week",
            "history": "/api/history/{date}",
            "historyRange": "/api/history/range/{start}/{end}",
            "lifetime": "/api/lifetime",
            "achievements": "/api/achievements",
            "export": "/api/export",
            "templates": "/api/admin/task-templates",
        }
    }))
}

/// Build the router with all routes.
pub fn build_router(state: DashboardServer) -> Router {
    // Configure CORS for the browser dashboard
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin = Router::new()
        .route(
            "/task-templates",
            get(api_list_templates).post(api_create_template),
        )
        .route(
            "/task-templates/{template_id}",
            put(api_update_template).delete(api_delete_template),
        )
        .route("/check-auth", get(api_check_auth))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/api/today", get(api_today))
        .route("/api/task/{task_id}", post(api_toggle_task))
        .route("/api/week", get(api_week))
        .route("/api/history/{date}", get(api_history))
        .route("/api/history/range/{start}/{end}", get(api_history_range))
        .route("/api/lifetime", get(api_lifetime))
        .route("/api/achievements", get(api_achievements))
        .route("/api/export", get(api_export))
        .nest("/api/admin", admin)
        .route("/api", get(api_root))
        .route("/api/health", get(health))
        // Add middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on `bind:port`.
///
/// Returns a oneshot sender that can be used to signal shutdown,
/// and the actual address the server is bound to.
pub async fn start_server(
    state: DashboardServer,
    bind: &str,
    port: u16,
) -> anyhow::Result<(oneshot::Sender<()>, SocketAddr)> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((bind, port)).await?;
    let bound_addr = listener.local_addr()?;

    info!("Dashboard API listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Dashboard API shutting down");
            })
            .await
        {
            tracing::error!("Dashboard server error: {}", e);
        }
    });

    Ok((shutdown_tx, bound_addr))
}
