//! Operator API, mounted under `/admin` when enabled.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/rule-sets", get(get_rule_sets))
        .route("/admin/monitor", get(get_monitor))
        .route("/admin/monitor/purge", post(purge_monitor))
        .route("/admin/access", get(get_access))
        .route("/admin/access/blocklist/{ip}", put(block_ip).delete(unblock_ip))
        .route("/admin/access/allowlist/{ip}", put(allow_ip).delete(disallow_ip))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
