//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! validation / security / http:
//!     → tracing macros (structured fields)  → logging.rs subscriber
//!     → metrics helpers (counters, gauges)  → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through the HTTP trace span
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
