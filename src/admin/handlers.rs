use std::net::IpAddr;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::security::access_control::AccessSnapshot;
use crate::security::monitor::{MonitorStats, WindowPolicy};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: i64,
    pub rule_sets: usize,
    pub signatures_enabled: bool,
    pub monitor: MonitorStats,
}

#[derive(Serialize)]
pub struct RuleSetSummary {
    pub name: String,
    pub fields: Vec<String>,
    pub rules: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSummary {
    #[serde(flatten)]
    pub stats: MonitorStats,
    pub default_policy: WindowPolicy,
    pub policies: std::collections::BTreeMap<String, WindowPolicy>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        rule_sets: state.engine.rule_set_names().count(),
        signatures_enabled: state.verifier.is_some(),
        monitor: state.monitor.stats(),
    })
}

pub async fn get_rule_sets(State(state): State<AppState>) -> Json<Vec<RuleSetSummary>> {
    let summaries = state
        .engine
        .rule_set_names()
        .filter_map(|name| state.engine.rule_set(name))
        .map(|rule_set| RuleSetSummary {
            name: rule_set.name().to_string(),
            fields: rule_set.field_paths().map(str::to_string).collect(),
            rules: rule_set.rule_count(),
        })
        .collect();
    Json(summaries)
}

pub async fn get_monitor(State(state): State<AppState>) -> Json<MonitorSummary> {
    let policies = state.monitor.policies();
    Json(MonitorSummary {
        stats: state.monitor.stats(),
        default_policy: policies.default_policy(),
        policies: policies.event_types().clone(),
    })
}

pub async fn purge_monitor(State(state): State<AppState>) -> Json<Value> {
    let dropped = state.monitor.purge_expired();
    Json(json!({ "dropped": dropped, "monitor": state.monitor.stats() }))
}

pub async fn get_access(State(state): State<AppState>) -> Json<AccessSnapshot> {
    Json(state.access.snapshot())
}

pub async fn block_ip(State(state): State<AppState>, Path(ip): Path<String>) -> Result<Json<Value>, ApiError> {
    let ip = parse_ip(&ip)?;
    let changed = state.access.block(ip);
    Ok(Json(json!({ "ip": ip, "list": "blocklist", "changed": changed })))
}

pub async fn unblock_ip(State(state): State<AppState>, Path(ip): Path<String>) -> Result<Json<Value>, ApiError> {
    let ip = parse_ip(&ip)?;
    let changed = state.access.unblock(ip);
    if changed {
        tracing::info!(ip = %ip, "Address unblocked");
    }
    Ok(Json(json!({ "ip": ip, "list": "blocklist", "changed": changed })))
}

pub async fn allow_ip(State(state): State<AppState>, Path(ip): Path<String>) -> Result<Json<Value>, ApiError> {
    let ip = parse_ip(&ip)?;
    let changed = state.access.allow(ip);
    Ok(Json(json!({ "ip": ip, "list": "allowlist", "changed": changed })))
}

pub async fn disallow_ip(State(state): State<AppState>, Path(ip): Path<String>) -> Result<Json<Value>, ApiError> {
    let ip = parse_ip(&ip)?;
    let changed = state.access.disallow(ip);
    Ok(Json(json!({ "ip": ip, "list": "allowlist", "changed": changed })))
}

fn parse_ip(raw: &str) -> Result<IpAddr, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("`{}` is not an IP address", raw)))
}
