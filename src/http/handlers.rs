//! Public API handlers.

use std::net::IpAddr;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::http::request::RequestContext;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::security::inspect::suspicious_patterns;
use crate::security::monitor::WindowSnapshot;
use crate::validation::{strip_null_bytes, ValidationResult};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationAccepted {
    pub success: bool,
    pub rule_set: String,
    #[serde(flatten)]
    pub result: ValidationResult,
}

/// `POST /v1/validate/{rule_set}`
pub async fn validate(
    State(state): State<AppState>,
    Path(rule_set): Path<String>,
    ctx: RequestContext,
    body: Bytes,
) -> Result<Response, ApiError> {
    let mut payload: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Malformed JSON body: {}", e)).with_request_id(&ctx.request_id))?;

    let stripped = strip_null_bytes(&mut payload);
    if stripped > 0 {
        tracing::debug!(request_id = %ctx.request_id, strings = stripped, "Stripped NUL bytes from payload");
    }

    inspect_request(&state, &ctx, &format!("POST /v1/validate/{} {}", rule_set, String::from_utf8_lossy(&body)));

    let result = state
        .engine
        .evaluate(&rule_set, &payload)
        .map_err(|e| ApiError::from(e).with_request_id(&ctx.request_id))?;

    if result.is_valid() {
        return Ok(Json(ValidationAccepted {
            success: true,
            rule_set,
            result,
        })
        .into_response());
    }

    tracing::info!(
        request_id = %ctx.request_id,
        rule_set = %rule_set,
        client = %ctx.client_ip,
        violations = result.violations().len(),
        "Validation failed"
    );
    state.record_security_event(
        "validationFailures",
        &ctx.client_ip.to_string(),
        Some(json!({ "ruleSet": rule_set, "violations": result.violations().len() })),
    );

    Err(ApiError::validation_failed(result.violations()).with_request_id(ctx.request_id))
}

/// Report hostile-looking requests as `suspiciousRequests` events.
fn inspect_request(state: &AppState, ctx: &RequestContext, text: &str) {
    let matched = suspicious_patterns(text);
    if matched.is_empty() {
        return;
    }
    tracing::warn!(
        request_id = %ctx.request_id,
        client = %ctx.client_ip,
        patterns = ?matched,
        "Suspicious request detected"
    );
    state.record_security_event(
        "suspiciousRequests",
        &ctx.client_ip.to_string(),
        Some(json!({ "patterns": matched })),
    );
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEventRequest {
    pub event_type: String,
    pub identifier: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct RecordEventResponse {
    pub exceeded: bool,
    pub count: usize,
    pub blocked: bool,
}

/// `POST /v1/security/events`
pub async fn record_event(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Bytes,
) -> Result<Json<RecordEventResponse>, ApiError> {
    let request: RecordEventRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Malformed event: {}", e)).with_request_id(&ctx.request_id))?;

    let event_type = request.event_type.trim();
    let identifier = request.identifier.trim();
    if event_type.is_empty() || identifier.is_empty() {
        return Err(ApiError::bad_request("eventType and identifier are required").with_request_id(ctx.request_id));
    }

    let (outcome, blocked) = state.record_security_event(event_type, identifier, request.metadata);
    Ok(Json(RecordEventResponse {
        exceeded: outcome.exceeded,
        count: outcome.count,
        blocked,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWindowResponse {
    pub event_type: String,
    pub identifier: String,
    #[serde(flatten)]
    pub window: WindowSnapshot,
}

/// `GET /v1/security/events/{event_type}/{identifier}`
pub async fn query_events(
    State(state): State<AppState>,
    Path((event_type, identifier)): Path<(String, String)>,
) -> Json<EventWindowResponse> {
    let window = state.monitor.query(&event_type, &identifier);
    Json(EventWindowResponse {
        event_type,
        identifier,
        window,
    })
}

/// `GET /v1/access/{ip}`
pub async fn check_access(
    State(state): State<AppState>,
    Path(ip): Path<String>,
    ctx: RequestContext,
) -> Result<Json<Value>, ApiError> {
    let ip: IpAddr = ip
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("`{}` is not an IP address", ip)).with_request_id(&ctx.request_id))?;

    let allowed = state.access.is_allowed(ip);
    Ok(Json(json!({ "ip": ip, "allowed": allowed, "mode": state.access.mode() })))
}
