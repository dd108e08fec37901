//! Request validation and security monitoring library.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod validation;

pub use config::schema::GuardConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
pub use security::monitor::SecurityEventMonitor;
pub use validation::ValidationEngine;
