use crate::adapters::FileConfigStore;
use crate::app::{BusClient, LifecycleCommand, LifecycleHandle, WriteGate};
use crate::domain::codec::{self, CodecError};
use crate::domain::write_gate::remediation_hints;
use crate::domain::{BusAddress, BusValue};
use crate::ports::BusError;
use axum::body::{Body, Bytes};
use axum::extract::{Query, Request, State};
use axum::http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{error, info, warn};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Per-cycle request state. The bus client sits behind one async mutex so
/// requests reach the bus strictly one at a time.
#[derive(Clone)]
pub struct AppState {
    bus: Arc<Mutex<BusClient>>,
    gate: Arc<WriteGate>,
    config: Arc<FileConfigStore>,
    lifecycle: LifecycleHandle,
    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        bus: BusClient,
        gate: Arc<WriteGate>,
        config: Arc<FileConfigStore>,
        lifecycle: LifecycleHandle,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            bus: Arc::new(Mutex::new(bus)),
            gate,
            config,
            lifecycle,
            started_at,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/settings", get(settings))
        .route("/services", get(services))
        .route("/value", get(read_value).post(write_value))
        .route("/text", get(read_text))
        .route("/ai-write-status", get(write_status))
        .route("/config", get(read_config).post(save_config))
        .route("/restart", post(restart))
        .route("/stop", post(stop))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            deferred_lifecycle,
        ))
        .layer(middleware::from_fn(cors))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Json<Value> {
    let decision = {
        let bus = state.bus.lock().await;
        state.gate.evaluate(&bus).await
    };
    let mode = if decision.enabled {
        "read-write"
    } else {
        "read-only"
    };
    Json(json!({
        "success": true,
        "name": "Victron DBus API Server",
        "version": VERSION,
        "mode": mode,
        "ai_write": decision,
        "endpoints": {
            "GET /": "API information",
            "GET /health": "Health check",
            "GET /settings": "All settings from com.victronenergy.settings",
            "GET /services": "Victron services registered on the bus",
            "GET /value": "Value at ?service=&path=",
            "GET /text": "Text representation at ?service=&path=",
            "GET /ai-write-status": "Write gate status and remediation hints",
            "GET /config": "Stored gateway configuration",
            "POST /config": "Replace gateway configuration",
            "POST /value": "Write {service, path, value} (requires the write switch)",
            "POST /restart": "Restart the gateway in place ({\"confirm\": true})",
            "POST /stop": "Stop the gateway ({\"confirm\": true})",
        },
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let uptime = (Utc::now() - state.started_at).num_seconds().max(0);
    Json(json!({
        "success": true,
        "status": "healthy",
        "version": VERSION,
        "state": state.lifecycle.state(),
        "started_at": state.started_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        "uptime_seconds": uptime,
    }))
}

async fn settings(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let items = {
        let bus = state.bus.lock().await;
        bus.get_all_settings().await.map_err(bus_error)?
    };
    let mut settings = Map::with_capacity(items.len());
    for (path, item) in items {
        settings.insert(path, encode(&item)?);
    }
    Ok(Json(json!({ "success": true, "settings": settings })))
}

async fn services(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let services = {
        let bus = state.bus.lock().await;
        bus.list_services().await.map_err(bus_error)?
    };
    Ok(Json(json!({
        "success": true,
        "count": services.len(),
        "services": services,
    })))
}

#[derive(Debug, Deserialize)]
struct AddressQuery {
    service: Option<String>,
    path: Option<String>,
}

impl AddressQuery {
    fn address(self) -> Result<BusAddress, ApiError> {
        match (self.service, self.path) {
            (Some(service), Some(path)) if !service.is_empty() && !path.is_empty() => {
                Ok(BusAddress::new(service, path))
            }
            _ => Err(ApiError::invalid(
                "missing_parameter",
                "Missing service or path parameter",
            )),
        }
    }
}

async fn read_value(
    State(state): State<AppState>,
    Query(query): Query<AddressQuery>,
) -> Result<Json<Value>, ApiError> {
    let address = query.address()?;
    let value = {
        let bus = state.bus.lock().await;
        bus.get_value(&address).await.map_err(bus_error)?
    };
    Ok(Json(json!({
        "success": true,
        "service": address.service,
        "path": address.path,
        "value": encode(&value)?,
    })))
}

async fn read_text(
    State(state): State<AppState>,
    Query(query): Query<AddressQuery>,
) -> Result<Json<Value>, ApiError> {
    let address = query.address()?;
    let text = {
        let bus = state.bus.lock().await;
        bus.get_text(&address).await.map_err(bus_error)?
    };
    Ok(Json(json!({
        "success": true,
        "service": address.service,
        "path": address.path,
        "text": text,
    })))
}

async fn write_status(State(state): State<AppState>) -> Json<Value> {
    let decision = {
        let bus = state.bus.lock().await;
        state.gate.evaluate(&bus).await
    };
    Json(json!({
        "success": true,
        "enabled": decision.enabled,
        "reason": decision.reason,
        "details": decision.details,
        "switch_name": state.gate.switch_name(),
        "hints": remediation_hints(state.gate.switch_name()),
    }))
}

async fn write_value(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let body = json_object(&body)?;
    let service = required_str(&body, "service")?;
    let path = required_str(&body, "path")?;
    let requested = body
        .get("value")
        .cloned()
        .ok_or_else(|| ApiError::invalid("missing_field", "Missing required field: value"))?;
    let address = BusAddress::new(service, path);

    let bus = state.bus.lock().await;

    let decision = state.gate.evaluate(&bus).await;
    if !decision.enabled {
        warn!(%address, reason = %decision.reason, "write refused by gate");
        let hints = remediation_hints(state.gate.switch_name());
        return Err(ApiError::forbidden(
            "write_disabled",
            format!("AI write disabled: {}", decision.reason),
        )
        .with_details(json!({ "ai_write": decision, "hints": hints })));
    }

    let previous_value = match bus.get_value(&address).await {
        Ok(value) => codec::encode(&value).unwrap_or(Value::Null),
        Err(_) => Value::Null,
    };

    let argument = codec::to_write_argument(&requested)
        .map_err(|err| ApiError::invalid("invalid_value", err.to_string()))?;
    let status = bus.set_value(&address, argument).await.map_err(bus_error)?;
    if status != 0 {
        warn!(%address, status, "write rejected by service");
        return Err(ApiError::invalid(
            "write_rejected",
            format!("Write rejected by {address} with status {status}"),
        )
        .with_details(json!({ "status": status, "previous_value": previous_value })));
    }

    let stored = bus.get_value(&address).await.map_err(bus_error)?;
    let value = encode(&stored)?;
    info!(%address, requested = %requested, stored = %value, "value written");

    Ok(Json(json!({
        "success": true,
        "service": address.service,
        "path": address.path,
        "requested_value": requested,
        "value": value,
        "previous_value": previous_value,
    })))
}

async fn read_config(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let config = state
        .config
        .load()
        .await
        .map_err(|err| ApiError::internal("config_error", err))?;
    Ok(Json(json!({ "success": true, "config": config })))
}

async fn save_config(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let document = parse_json(&body)?;
    state
        .config
        .save(&document)
        .await
        .map_err(|err| ApiError::internal("config_error", err))?;
    info!(path = %state.config.path().display(), "config saved");
    Ok(Json(json!({ "success": true, "config": document })))
}

#[derive(Debug, Clone, Copy)]
struct DeferredLifecycle(LifecycleCommand);

async fn restart(body: Bytes) -> Result<impl IntoResponse, ApiError> {
    require_confirm(&body, "Restart")?;
    info!("msg" = "restart requested");
    Ok((
        Extension(DeferredLifecycle(LifecycleCommand::Restart)),
        Json(json!({ "success": true, "message": "Restart initiated" })),
    ))
}

async fn stop(body: Bytes) -> Result<impl IntoResponse, ApiError> {
    require_confirm(&body, "Stop")?;
    info!("msg" = "stop requested");
    Ok((
        Extension(DeferredLifecycle(LifecycleCommand::Stop)),
        Json(json!({ "success": true, "message": "Stop initiated" })),
    ))
}

fn require_confirm(body: &Bytes, action: &str) -> Result<(), ApiError> {
    let body = if body.is_empty() {
        Map::new()
    } else {
        json_object(body)?
    };
    if body.get("confirm").and_then(Value::as_bool) == Some(true) {
        Ok(())
    } else {
        Err(ApiError::invalid(
            "confirmation_required",
            format!("{action} requires {{\"confirm\": true}}"),
        ))
    }
}

/// Sends a lifecycle command once the response body has been fully handed
/// to the connection. If the client goes away first, the command still
/// fires when the body is dropped.
struct PendingCommand {
    lifecycle: LifecycleHandle,
    command: Option<LifecycleCommand>,
}

impl PendingCommand {
    fn fire(&mut self) {
        if let Some(command) = self.command.take() {
            self.lifecycle.dispatch(command);
        }
    }
}

impl Drop for PendingCommand {
    fn drop(&mut self) {
        self.fire();
    }
}

async fn deferred_lifecycle(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let Some(DeferredLifecycle(command)) = response.extensions_mut().remove::<DeferredLifecycle>()
    else {
        return response;
    };

    let mut pending = PendingCommand {
        lifecycle: state.lifecycle.clone(),
        command: Some(command),
    };
    let (parts, body) = response.into_parts();
    let tail = stream::once(async move { pending.fire() })
        .filter_map(|()| async { None::<Result<Bytes, axum::Error>> });
    Response::from_parts(parts, Body::from_stream(body.into_data_stream().chain(tail)))
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

fn parse_json(body: &Bytes) -> Result<Value, ApiError> {
    if body.is_empty() {
        return Err(ApiError::invalid("missing_body", "Request body required"));
    }
    serde_json::from_slice(body)
        .map_err(|err| ApiError::invalid("invalid_json", format!("Invalid JSON: {err}")))
}

fn json_object(body: &Bytes) -> Result<Map<String, Value>, ApiError> {
    match parse_json(body)? {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::invalid(
            "invalid_json",
            "Request body must be a JSON object",
        )),
    }
}

fn required_str(body: &Map<String, Value>, field: &str) -> Result<String, ApiError> {
    match body.get(field).and_then(Value::as_str) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(ApiError::invalid(
            "missing_field",
            format!("Missing required field: {field}"),
        )),
    }
}

fn encode(value: &BusValue) -> Result<Value, ApiError> {
    codec::encode(value).map_err(|err: CodecError| ApiError::internal("codec_error", err))
}

fn bus_error(err: BusError) -> ApiError {
    error!(%err, "bus call failed");
    ApiError::internal("bus_error", err)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    code: &'static str,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: String) -> Self {
        Self {
            status,
            body: ErrorBody {
                success: false,
                code,
                error: message,
                details: None,
            },
        }
    }

    fn invalid(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message.into())
    }

    fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, code, message.into())
    }

    fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message.into())
    }

    fn internal(code: &'static str, err: impl Into<anyhow::Error>) -> Self {
        let err = err.into();
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, format!("{err:#}"))
    }

    fn with_details(mut self, details: Value) -> Self {
        self.body.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(self.body);
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryBus;
    use crate::app::WriteGateConfig;
    use crate::ports::PlatformProbe;
    use async_trait::async_trait;
    use axum::http::Request;
    use futures::TryStreamExt;
    use tempfile::TempDir;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    const SWITCH: &str = "com.victronenergy.switch.virtual_0";
    const SETPOINT: &str = "/Settings/CGwacs/AcPowerSetPoint";
    const SETTINGS: &str = "com.victronenergy.settings";

    struct LargeImage;

    #[async_trait]
    impl PlatformProbe for LargeImage {
        async fn image_variant(&self) -> Option<String> {
            Some("large".to_string())
        }
    }

    struct Fixture {
        bus: Arc<InMemoryBus>,
        commands: mpsc::UnboundedReceiver<LifecycleCommand>,
        app: Router,
        _temp: TempDir,
    }

    fn fixture(switch_state: i32) -> Fixture {
        let temp = tempfile::tempdir().unwrap();
        let bus = Arc::new(InMemoryBus::new());
        bus.insert(SETTINGS, "/Settings/Services/NodeRed", BusValue::Int32(1));
        bus.insert(SETTINGS, SETPOINT, BusValue::Double(50.0));
        bus.clamp_writes(SETTINGS, SETPOINT, -1000.0, 1000.0);
        bus.insert(SWITCH, "/CustomName", BusValue::str("AI Write Enable"));
        bus.insert(SWITCH, "/SwitchableOutput/0/State", BusValue::Int32(switch_state));

        let (lifecycle, commands) = LifecycleHandle::detached();
        let state = AppState::new(
            BusClient::new(bus.clone()),
            Arc::new(WriteGate::new(WriteGateConfig::default(), Arc::new(LargeImage))),
            Arc::new(FileConfigStore::new(temp.path().join("config.json"))),
            lifecycle,
            Utc::now(),
        );
        Fixture {
            bus,
            commands,
            app: router(state),
            _temp: temp,
        }
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response
            .into_body()
            .into_data_stream()
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_state_and_start_time() {
        let fx = fixture(1);
        let response = fx.app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["state"], "serving");
        assert!(body["started_at"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn settings_are_returned_as_item_dictionaries() {
        let fx = fixture(1);
        let body = body_json(fx.app.oneshot(get("/settings")).await.unwrap()).await;
        assert_eq!(body["settings"][SETPOINT]["Value"], 50.0);
        assert_eq!(body["settings"][SETPOINT]["Text"], "50");
    }

    #[tokio::test]
    async fn value_read_requires_both_parameters() {
        let fx = fixture(1);
        let response = fx
            .app
            .oneshot(get("/value?service=com.victronenergy.settings"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Missing service or path parameter");
    }

    #[tokio::test]
    async fn missing_object_is_an_upstream_error() {
        let fx = fixture(1);
        let response = fx
            .app
            .oneshot(get("/value?service=com.victronenergy.settings&path=/Nope"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["code"], "bus_error");
        assert!(body["error"].as_str().unwrap().contains("/Nope"));
    }

    #[tokio::test]
    async fn gated_write_is_refused_with_hints() {
        let fx = fixture(0);
        let payload = json!({"service": SETTINGS, "path": SETPOINT, "value": 200}).to_string();
        let response = fx.app.oneshot(post("/value", &payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["details"]["ai_write"]["reason"], "switch off");
        assert_eq!(body["details"]["ai_write"]["details"]["switch_state"], 0);
        assert!(body["details"]["hints"]["switch_off"].is_string());
        assert_eq!(fx.bus.value(SETTINGS, SETPOINT), Some(BusValue::Double(50.0)));
        assert_eq!(fx.bus.write_count(), 0);
    }

    #[tokio::test]
    async fn write_reports_value_read_back_from_bus() {
        let fx = fixture(1);
        let payload = json!({"service": SETTINGS, "path": SETPOINT, "value": 5000.0}).to_string();
        let response = fx.app.oneshot(post("/value", &payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["requested_value"], 5000.0);
        assert_eq!(body["value"], 1000.0);
        assert_eq!(body["previous_value"], 50.0);
    }

    #[tokio::test]
    async fn rejected_write_has_no_value_field() {
        let fx = fixture(1);
        fx.bus.reject_writes(SETTINGS, SETPOINT, 2);
        let payload = json!({"service": SETTINGS, "path": SETPOINT, "value": 10}).to_string();
        let response = fx.app.oneshot(post("/value", &payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body.get("value").is_none());
        assert_eq!(body["details"]["status"], 2);
        assert_eq!(body["details"]["previous_value"], 50.0);
        assert_eq!(fx.bus.value(SETTINGS, SETPOINT), Some(BusValue::Double(50.0)));
    }

    #[tokio::test]
    async fn write_body_errors_are_client_errors() {
        let fx = fixture(1);
        let response = fx.app.clone().oneshot(post("/value", "{oops")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "invalid_json");

        let payload = json!({"service": SETTINGS, "value": 1}).to_string();
        let response = fx.app.clone().oneshot(post("/value", &payload)).await.unwrap();
        assert_eq!(body_json(response).await["error"], "Missing required field: path");

        let payload = json!({"service": SETTINGS, "path": SETPOINT, "value": [1, 2]}).to_string();
        let response = fx.app.oneshot(post("/value", &payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "invalid_value");
    }

    #[tokio::test]
    async fn restart_without_confirmation_does_nothing() {
        let mut fx = fixture(1);
        let response = fx.app.oneshot(post("/restart", "{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Restart requires {\"confirm\": true}");
        assert!(fx.commands.try_recv().is_err());
    }

    #[tokio::test]
    async fn stop_fires_only_after_body_is_consumed() {
        let mut fx = fixture(1);
        let response = fx
            .app
            .oneshot(post("/stop", r#"{"confirm": true}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(fx.commands.try_recv().is_err());

        let body = body_json(response).await;
        assert_eq!(body["message"], "Stop initiated");
        assert_eq!(fx.commands.try_recv().unwrap(), LifecycleCommand::Stop);
    }

    #[tokio::test]
    async fn config_roundtrip() {
        let fx = fixture(1);
        let body = body_json(fx.app.clone().oneshot(get("/config")).await.unwrap()).await;
        assert_eq!(body["config"], json!({}));

        let saved = json!({"poll_seconds": 5, "labels": ["a", "b"]}).to_string();
        let response = fx.app.clone().oneshot(post("/config", &saved)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(fx.app.oneshot(get("/config")).await.unwrap()).await;
        assert_eq!(body["config"]["poll_seconds"], 5);
    }

    #[tokio::test]
    async fn preflight_and_unknown_routes() {
        let fx = fixture(1);
        let preflight = Request::builder()
            .method("OPTIONS")
            .uri("/value")
            .body(Body::empty())
            .unwrap();
        let response = fx.app.clone().oneshot(preflight).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, OPTIONS"
        );

        let response = fx.app.oneshot(get("/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Not found");
    }

    #[tokio::test]
    async fn write_status_lists_every_hint() {
        let fx = fixture(1);
        let body = body_json(fx.app.oneshot(get("/ai-write-status")).await.unwrap()).await;
        assert_eq!(body["enabled"], true);
        assert_eq!(body["reason"], "switch on");
        assert_eq!(body["hints"].as_object().unwrap().len(), 5);
    }
}
