use crate::adapters::LogFile;
use crate::app::ControlService;
use crate::domain::ServiceStatus;
use crate::ports::ControlError;
use axum::body::Bytes;
use axum::extract::{Query, Request, State};
use axum::http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DEFAULT_LOG_LINES: usize = 50;
pub const MAX_LOG_LINES: usize = 500;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ControlService>,
    pub logs: Arc<LogFile>,
    pub service_name: String,
    pub service_dir: String,
    pub started_at: DateTime<Utc>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/logs", get(logs))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/restart", post(restart))
        .route("/upgrade", post(upgrade))
        .fallback(not_found)
        .layer(middleware::from_fn(cors))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "name": "Victron DBus API Control Server",
        "version": VERSION,
        "managed_service": state.service_name,
        "endpoints": {
            "GET /": "Control server information",
            "GET /health": "Control server health check",
            "GET /status": "Managed service status",
            "GET /logs": "Recent log entries (optional: ?lines=N)",
            "POST /start": "Start managed service",
            "POST /stop": "Stop managed service",
            "POST /restart": "Restart managed service",
            "POST /upgrade": "Git pull and restart",
        },
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "service": "dbus-api-control",
        "version": VERSION,
        "status": "healthy",
        "started_at": state.started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        "uptime_seconds": (Utc::now() - state.started_at).num_seconds().max(0),
    }))
}

async fn status(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let status = state.service.status().await.map_err(control_error)?;
    let mut body = json!({
        "success": true,
        "service": state.service_name,
        "service_path": state.service_dir,
    });
    merge_status(&mut body, &status);
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    lines: Option<String>,
}

async fn logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Value>, ApiError> {
    let requested = match query.lines {
        Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
            ApiError::invalid("invalid_parameter", format!("Invalid lines value: {raw}"))
        })?,
        None => DEFAULT_LOG_LINES,
    };
    let lines = requested.min(MAX_LOG_LINES);
    let logs = state.logs.tail(lines).await.map_err(control_error)?;
    Ok(Json(json!({
        "success": true,
        "log_path": state.logs.path().display().to_string(),
        "lines_requested": lines,
        "lines_returned": logs.len(),
        "logs": logs,
    })))
}

async fn start(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let status = state
        .service
        .start(confirmed(&body)?)
        .await
        .map_err(control_error)?;
    Ok(Json(status_response("Start command sent", &status)))
}

async fn stop(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let status = state
        .service
        .stop(confirmed(&body)?)
        .await
        .map_err(control_error)?;
    Ok(Json(status_response("Stop command sent", &status)))
}

async fn restart(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let status = state
        .service
        .restart(confirmed(&body)?)
        .await
        .map_err(control_error)?;
    Ok(Json(status_response("Restart completed", &status)))
}

async fn upgrade(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let report = state
        .service
        .upgrade(confirmed(&body)?)
        .await
        .map_err(control_error)?;
    let mut body = status_response("Upgrade completed", &report.status);
    body["git_output"] = Value::String(report.git_output);
    Ok(Json(body))
}

fn status_response(message: &str, status: &ServiceStatus) -> Value {
    let mut body = json!({ "success": true, "message": message });
    merge_status(&mut body, status);
    body
}

fn merge_status(body: &mut Value, status: &ServiceStatus) {
    body["running"] = json!(status.running);
    body["pid"] = json!(status.pid);
    body["uptime_seconds"] = json!(status.uptime_seconds);
    body["raw_status"] = json!(status.raw);
    if let Some(error) = &status.error {
        body["error"] = json!(error);
    }
}

/// Reads `confirm` from an optional JSON body. Absent body or field means
/// not confirmed; the service decides what that implies.
fn confirmed(body: &Bytes) -> Result<bool, ApiError> {
    if body.is_empty() {
        return Ok(false);
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| ApiError::invalid("invalid_json", format!("Invalid JSON: {err}")))?;
    Ok(value.get("confirm").and_then(Value::as_bool) == Some(true))
}

async fn cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    info!(
        %method,
        %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

async fn not_found() -> ApiError {
    ApiError::not_found("not_found", "Not found")
}

fn control_error(err: ControlError) -> ApiError {
    match err {
        ControlError::ConfirmationRequired { .. } => {
            ApiError::invalid("confirmation_required", err.to_string())
        }
        ControlError::NotGitRepository => ApiError::invalid("not_git_repository", err.to_string()),
        ControlError::Timeout { .. } => {
            error!(%err, "control command timed out");
            ApiError::internal("command_timeout", err)
        }
        ControlError::Command { .. } => {
            error!(%err, "control command failed");
            ApiError::internal("command_failed", err)
        }
        ControlError::Io { .. } => {
            error!(%err, "control I/O failed");
            ApiError::internal("io_error", err)
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    code: &'static str,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn invalid(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                success: false,
                code,
                error: message.into(),
            },
        }
    }

    fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: ErrorBody {
                success: false,
                code,
                error: message.into(),
            },
        }
    }

    fn internal(code: &'static str, err: impl Into<anyhow::Error>) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody {
                success: false,
                code,
                error: err.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(self.body);
        (status, body).into_response()
    }
}
