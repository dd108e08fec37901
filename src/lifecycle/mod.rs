//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Logging → Metrics → Rule sets + monitor → Bind → Serve
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Stop accepting → Drain in-flight requests (bounded) → Exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and reported before binding
//! - The listener binds last so traffic only arrives once rule sets compiled
//! - Draining is bounded by `timeouts.shutdown_secs`

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{launch, StartupError};
