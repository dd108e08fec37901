//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, thresholds > 0)
//! - Check that addresses and IP lists parse
//! - Reject secrets left empty or at their placeholder
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GuardConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use crate::config::schema::GuardConfig;
use crate::security::monitor::WindowPolicy;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const MAX_WINDOW_SECS: u64 = 30 * 24 * 3600;
const ADMIN_KEY_PLACEHOLDER: &str = "CHANGE_ME_IN_PRODUCTION";

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Check a parsed configuration.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("`{}` is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("must be one of {}", LOG_LEVELS.join(", ")),
        ));
    }
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("`{}` is not a socket address", observability.metrics_address),
        ));
    }

    check_policy("monitor.default_policy", &config.monitor.default_policy, &mut errors);
    for (event_type, policy) in &config.monitor.event_types {
        if event_type.trim().is_empty() {
            errors.push(ValidationError::new("monitor.event_types", "event type name is empty"));
        }
        check_policy(&format!("monitor.event_types.{}", event_type), policy, &mut errors);
    }

    let acl = &config.access_control;
    for (field, list) in [
        ("access_control.allowlist", &acl.allowlist),
        ("access_control.blocklist", &acl.blocklist),
        ("access_control.trusted_proxies", &acl.trusted_proxies),
    ] {
        for entry in list {
            if entry.trim().parse::<IpAddr>().is_err() {
                errors.push(ValidationError::new(field, format!("`{}` is not an IP address", entry)));
            }
        }
    }
    if acl.auto_block_event_types.iter().any(|t| t.trim().is_empty()) {
        errors.push(ValidationError::new("access_control.auto_block_event_types", "event type name is empty"));
    }

    let signature = &config.signature;
    if signature.enabled && signature.secret.trim().is_empty() {
        errors.push(ValidationError::new("signature.secret", "required when signatures are enabled"));
    }
    if signature.max_skew_ms == 0 {
        errors.push(ValidationError::new("signature.max_skew_ms", "must be greater than 0"));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }
    if config.security.allowed_content_types.is_empty() {
        errors.push(ValidationError::new("security.allowed_content_types", "must list at least one type"));
    }

    if config.admin.enabled {
        let key = config.admin.api_key.trim();
        if key.is_empty() || key == ADMIN_KEY_PLACEHOLDER {
            errors.push(ValidationError::new("admin.api_key", "must be set when the admin API is enabled"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_policy(field: &str, policy: &WindowPolicy, errors: &mut Vec<ValidationError>) {
    if policy.window_secs == 0 || policy.window_secs > MAX_WINDOW_SECS {
        errors.push(ValidationError::new(
            format!("{}.window_secs", field),
            format!("must be between 1 and {}", MAX_WINDOW_SECS),
        ));
    }
    if policy.threshold == 0 {
        errors.push(ValidationError::new(format!("{}.threshold", field), "must be greater than 0"));
    }
}
