//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration and install logging
//! - Start the metrics exporter when enabled
//! - Compile rule sets and build shared state
//! - Bind the listener, serve, and drain on shutdown

use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::schema::GuardConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::wait_for_signal;
use crate::observability::{logging, metrics};
use crate::validation::ConfigurationError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", format_errors(.0))]
    Config(Vec<ValidationError>),

    #[error("rule sets failed to compile: {0}")]
    RuleSets(#[from] ConfigurationError),

    #[error("invalid metrics address `{0}`")]
    MetricsAddress(String),

    #[error("metrics exporter failed to start: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Run the guard until SIGINT/SIGTERM.
pub async fn launch(config: GuardConfig) -> Result<(), StartupError> {
    validate_config(&config).map_err(StartupError::Config)?;
    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        signatures = config.signature.enabled,
        "circle-guard starting"
    );

    if config.observability.metrics_enabled {
        let addr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let grace = Duration::from_secs(config.timeouts.shutdown_secs);
    let address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    let shutdown = Shutdown::new();
    let mut serving = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        finished = &mut serving => {
            return flatten(finished);
        }
        _ = wait_for_signal() => {}
    }

    shutdown.trigger();
    match shutdown.drain(serving, grace).await {
        Some(finished) => flatten(finished)?,
        None => tracing::warn!("In-flight requests abandoned"),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn flatten(joined: Result<std::io::Result<()>, tokio::task::JoinError>) -> Result<(), StartupError> {
    match joined {
        Ok(result) => result.map_err(StartupError::Serve),
        Err(e) => Err(StartupError::Serve(std::io::Error::other(e))),
    }
}
