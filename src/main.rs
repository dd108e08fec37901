//! circle-guard: request validation and security monitoring sidecar.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client / upstream app                 ┌──────────────────────────────────────────┐
//!     ───────────────────────────────────────▶  http (tower layers, security policy)    │
//!                                           │        │                                 │
//!                                           │        ├─▶ signature check (/v1)         │
//!                                           │        │                                 │
//!                                           │        ├─▶ validation engine (rule sets) │
//!                                           │        ├─▶ security event monitor        │
//!                                           │        └─▶ IP access control             │
//!                                           │                                          │
//!                                           │  admin (bearer key) · config · lifecycle │
//!                                           │  observability (tracing, Prometheus)     │
//!                                           └──────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use circle_guard::config::{load_config, GuardConfig};
use circle_guard::lifecycle::launch;

#[derive(Parser)]
#[command(name = "circle-guard", version)]
#[command(about = "Request validation and security event monitoring service", long_about = None)]
struct Args {
    /// Path to a TOML config file. Built-in defaults are used when omitted.
    #[arg(short, long, env = "CIRCLE_GUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("circle-guard: {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => GuardConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    match launch(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            eprintln!("circle-guard: {}", e);
            ExitCode::FAILURE
        }
    }
}
