//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (HTTPS redirect, hardening headers on the way out)
//!     → signature.rs (HMAC check on /v1 when enabled)
//!     → content_type.rs (body methods declare an allowed type)
//!     → inspect.rs (hostile-pattern scan → suspiciousRequests)
//!
//! Security events (failed logins, bad signatures, validation failures):
//!     → monitor.rs (sliding window per event type and identifier)
//!     → access_control.rs (auto-block when configured)
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Threshold trips are signals for operators, never errors
//! - No trust in client input

pub mod access_control;
pub mod content_type;
pub mod headers;
pub mod inspect;
pub mod monitor;
pub mod signature;

pub use access_control::{AccessMode, AccessSnapshot, IpAccessControl};
pub use content_type::{check_content_type, ContentTypeError};
pub use headers::{https_redirect_target, security_headers};
pub use monitor::{
    Clock, ManualClock, MonitorPolicies, MonitorStats, SecurityEventMonitor, SystemClock, ThresholdOutcome,
    WindowPolicy, WindowSnapshot,
};
pub use signature::{RequestVerifier, SignatureError};
