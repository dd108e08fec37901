//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID, security policy)
//! - Bind server to listener and drain on shutdown
//!
//! # Layer order (outermost first)
//! ```text
//! SetRequestId → PropagateRequestId → Trace → Timeout → BodyLimit
//!     → security_headers (HTTPS redirect, hardening headers)
//!     → /v1: verify_signature → enforce_content_type → handler
//!     → /admin: admin_auth → handler
//! ```

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::config::GuardConfig;
use crate::http::handlers;
use crate::http::middleware;
use crate::http::request::MakeRequestUuid;
use crate::security::access_control::IpAccessControl;
use crate::security::monitor::{Clock, SecurityEventMonitor, SystemClock, ThresholdOutcome};
use crate::security::signature::RequestVerifier;
use crate::validation::{ConfigurationError, ValidationEngine};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GuardConfig>,
    pub engine: Arc<ValidationEngine>,
    pub monitor: Arc<SecurityEventMonitor>,
    pub access: Arc<IpAccessControl>,
    pub verifier: Option<Arc<RequestVerifier>>,
    /// Peers allowed to name the client through `X-Forwarded-For`.
    pub trusted_proxies: Arc<[IpAddr]>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// State with the built-in rule sets and the wall clock.
    pub fn new(config: GuardConfig) -> Result<Self, ConfigurationError> {
        Self::with_parts(config, ValidationEngine::with_builtin_rule_sets()?, Arc::new(SystemClock))
    }

    /// State from explicit parts, for embedding and tests.
    pub fn with_parts(
        config: GuardConfig,
        engine: ValidationEngine,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigurationError> {
        let monitor = SecurityEventMonitor::with_clock(config.monitor.policies(), clock);
        let access = IpAccessControl::new(
            config.access_control.mode,
            parse_ips(&config.access_control.allowlist),
            parse_ips(&config.access_control.blocklist),
        );
        let verifier = config
            .signature
            .enabled
            .then(|| Arc::new(RequestVerifier::new(&config.signature.secret, config.signature.max_skew_ms)));
        let trusted_proxies = parse_ips(&config.access_control.trusted_proxies)
            .into_iter()
            .map(|ip| ip.to_canonical())
            .collect();

        Ok(Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            monitor: Arc::new(monitor),
            access: Arc::new(access),
            verifier,
            trusted_proxies,
            started_at: Utc::now(),
        })
    }

    /// Record a security event and apply auto-blocking.
    ///
    /// Returns the outcome and whether the identifier is now blocked.
    pub fn record_security_event(
        &self,
        event_type: &str,
        identifier: &str,
        metadata: Option<Value>,
    ) -> (ThresholdOutcome, bool) {
        let outcome = self.monitor.record_event(event_type, identifier, metadata);
        if !outcome.exceeded {
            return (outcome, false);
        }

        let auto_block = self
            .config
            .access_control
            .auto_block_event_types
            .iter()
            .any(|t| t == event_type);
        let blocked = match identifier.parse::<IpAddr>() {
            Ok(ip) if auto_block => {
                self.access.block(ip);
                true
            }
            _ => false,
        };
        (outcome, blocked)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("rule_sets", &self.engine.rule_set_names().count())
            .field("monitor", &self.monitor)
            .field("signatures", &self.verifier.is_some())
            .finish_non_exhaustive()
    }
}

fn parse_ips(entries: &[String]) -> Vec<IpAddr> {
    entries
        .iter()
        .filter_map(|entry| match entry.trim().parse() {
            Ok(ip) => Some(ip),
            Err(_) => {
                tracing::warn!(entry = %entry, "Ignoring invalid IP address");
                None
            }
        })
        .collect()
}

/// HTTP server for the guard.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GuardConfig) -> Result<Self, ConfigurationError> {
        Ok(Self::from_state(AppState::new(config)?))
    }

    pub fn from_state(state: AppState) -> Self {
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let config = state.config.clone();

        let v1 = Router::new()
            .route("/v1/validate/{rule_set}", post(handlers::validate))
            .route("/v1/security/events", post(handlers::record_event))
            .route("/v1/security/events/{event_type}/{identifier}", get(handlers::query_events))
            .route("/v1/access/{ip}", get(handlers::check_access))
            .layer(from_fn_with_state(state.clone(), middleware::enforce_content_type))
            .layer(from_fn_with_state(state.clone(), middleware::verify_signature));

        let mut router = Router::new().route("/health", get(handlers::health)).merge(v1);
        if config.admin.enabled {
            router = router.merge(admin::setup_admin_router(state.clone()));
        }

        router
            .layer(from_fn_with_state(state.clone(), middleware::security_policy))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            rule_sets = self.state.engine.rule_set_names().count(),
            signatures = self.state.verifier.is_some(),
            admin = self.state.config.admin.enabled,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GuardConfig {
        &self.state.config
    }
}
