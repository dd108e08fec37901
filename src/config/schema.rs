//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::security::access_control::AccessMode;
use crate::security::monitor::{MonitorPolicies, WindowPolicy};
use crate::security::signature::DEFAULT_MAX_SKEW_MS;

/// Root configuration for the guard service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Security event monitor policies.
    pub monitor: MonitorConfig,

    /// IP allow/block lists.
    pub access_control: AccessControlConfig,

    /// Request signature verification.
    pub signature: SignatureConfig,

    /// Security hardening.
    pub security: SecurityConfig,

    /// Admin API.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Grace period for in-flight requests on shutdown, in seconds.
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            shutdown_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security event monitor configuration.
///
/// Entries in `event_types` are layered over the standard policies, so a
/// file only lists what it changes.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Policy for event types without an entry.
    pub default_policy: WindowPolicy,

    /// Per event type overrides.
    pub event_types: BTreeMap<String, WindowPolicy>,
}

impl MonitorConfig {
    /// Standard policies with this config's overrides applied.
    pub fn policies(&self) -> MonitorPolicies {
        let mut event_types = MonitorPolicies::standard().event_types().clone();
        event_types.extend(self.event_types.iter().map(|(name, policy)| (name.clone(), *policy)));
        MonitorPolicies::new(self.default_policy, event_types)
    }
}

/// IP access control configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessControlConfig {
    /// `blocklist` or `allowlist`.
    pub mode: AccessMode,

    /// Addresses allowed in allowlist mode.
    #[serde(alias = "whitelist")]
    pub allowlist: Vec<String>,

    /// Addresses denied in blocklist mode.
    #[serde(alias = "blacklist")]
    pub blocklist: Vec<String>,

    /// Event types whose threshold trips block the identifier, when it is
    /// an IP address.
    pub auto_block_event_types: Vec<String>,

    /// Peers whose `X-Forwarded-For` header names the client. Requests from
    /// any other peer are keyed on the peer address.
    pub trusted_proxies: Vec<String>,
}

impl Default for AccessControlConfig {
    fn default() -> Self {
        Self {
            mode: AccessMode::Blocklist,
            allowlist: Vec::new(),
            blocklist: Vec::new(),
            auto_block_event_types: vec!["suspiciousRequests".to_string()],
            trusted_proxies: Vec::new(),
        }
    }
}

/// Request signature configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignatureConfig {
    /// Require signed requests on /v1.
    pub enabled: bool,

    /// Shared HMAC secret.
    pub secret: String,

    /// Accepted clock skew in milliseconds.
    pub max_skew_ms: u64,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            secret: String::new(),
            max_skew_ms: DEFAULT_MAX_SKEW_MS,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,

    /// Redirect requests not forwarded as HTTPS.
    pub enforce_https: bool,

    /// Maximum body size in bytes.
    pub max_body_size: usize,

    /// Accepted request content types for POST/PUT/PATCH.
    pub allowed_content_types: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            enforce_https: false,
            max_body_size: 1024 * 1024, // 1MB
            allowed_content_types: vec!["application/json".to_string()],
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount /admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}
