use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::http::request::request_id;
use crate::http::response::ApiError;
use crate::http::server::AppState;

/// Require `Authorization: Bearer <admin.api_key>`.
pub async fn admin_auth_middleware(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if let Some(token) = provided {
        let expected = state.config.admin.api_key.as_bytes();
        if bool::from(token.as_bytes().ct_eq(expected)) {
            return next.run(request).await;
        }
    }

    tracing::warn!(path = %request.uri().path(), "Admin request rejected");
    ApiError::unauthorized()
        .with_request_id(request_id(request.headers()))
        .into_response()
}
