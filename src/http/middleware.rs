//! Request policy middleware.
//!
//! - `security_policy`: HTTPS redirect, then hardening headers on the response
//! - `verify_signature`: HMAC check for /v1 when signatures are enabled
//! - `enforce_content_type`: body methods must declare an allowed type

use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde_json::json;

use crate::http::request::{peer_ip, request_id};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::content_type::check_content_type;
use crate::security::headers::{https_redirect_target, security_headers};
use crate::security::signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER};

pub async fn security_policy(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    let security = &state.config.security;
    let path = request.uri().path().to_string();

    if security.enforce_https {
        let proto = header_str(&request, "x-forwarded-proto");
        let host = header_str(&request, header::HOST.as_str());
        let path_and_query = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        if let Some(target) = https_redirect_target(proto, host, path_and_query) {
            tracing::debug!(target = %target, "Redirecting to HTTPS");
            return match HeaderValue::from_str(&target) {
                Ok(location) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response(),
                Err(_) => ApiError::bad_request("Invalid host").into_response(),
            };
        }
    }

    let mut response = next.run(request).await;
    if security.enable_headers {
        let headers = response.headers_mut();
        for (name, value) in security_headers(&path) {
            headers.insert(name, value);
        }
    }
    response
}

pub async fn verify_signature(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    let Some(verifier) = state.verifier.clone() else {
        return next.run(request).await;
    };

    let (parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers);
    let body = match to_bytes(body, state.config.security.max_body_size).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
                .with_request_id(request_id)
                .into_response()
        }
    };

    let timestamp = parts.headers.get(TIMESTAMP_HEADER).and_then(|v| v.to_str().ok());
    let signature = parts.headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let result = verifier.verify(
        parts.method.as_str(),
        parts.uri.path(),
        timestamp,
        signature,
        &body,
        Utc::now().timestamp_millis(),
    );

    if let Err(err) = result {
        let peer = peer_ip(&parts.extensions);
        tracing::warn!(
            request_id = %request_id,
            ip = %peer,
            method = %parts.method,
            path = %parts.uri.path(),
            reason = err.reason(),
            "Request signature rejected"
        );
        metrics::record_signature_rejection(err.reason());
        state.record_security_event(
            "invalidSignature",
            &peer.to_string(),
            Some(json!({ "path": parts.uri.path(), "reason": err.reason() })),
        );
        return ApiError::from(err).with_request_id(request_id).into_response();
    }

    next.run(Request::from_parts(parts, Body::from(body))).await
}

pub async fn enforce_content_type(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    let content_type = header_str(&request, header::CONTENT_TYPE.as_str());
    match check_content_type(request.method(), content_type, &state.config.security.allowed_content_types) {
        Ok(()) => next.run(request).await,
        Err(err) => {
            let request_id = request_id(request.headers());
            tracing::debug!(request_id = %request_id, error = %err, "Content type rejected");
            ApiError::from(err).with_request_id(request_id).into_response()
        }
    }
}

fn header_str<'a>(request: &'a Request<Body>, name: &str) -> Option<&'a str> {
    request.headers().get(name).and_then(|v| v.to_str().ok())
}
