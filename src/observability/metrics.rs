//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guard_validations_total` (counter): evaluations by rule set, outcome
//! - `guard_rule_evaluation_errors_total` (counter): custom predicate failures
//! - `guard_security_events_total` (counter): recorded events by type
//! - `guard_threshold_exceeded_total` (counter): threshold trips by type
//! - `guard_signature_rejections_total` (counter): rejected signatures by reason
//! - `guard_access_denied_total` (counter): access-list denials
//! - `guard_tracked_windows` (gauge): live monitor windows
//!
//! # Design Decisions
//! - Helpers are no-ops until a recorder is installed, so tests and
//!   embedders pay nothing
//! - Labels stay low-cardinality: never an identifier or IP

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_validation(rule_set: &str, valid: bool) {
    let outcome = if valid { "valid" } else { "invalid" };
    metrics::counter!(
        "guard_validations_total",
        "rule_set" => rule_set.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_rule_evaluation_error(rule_set: &str) {
    metrics::counter!("guard_rule_evaluation_errors_total", "rule_set" => rule_set.to_string()).increment(1);
}

pub fn record_security_event(event_type: &str) {
    metrics::counter!("guard_security_events_total", "event_type" => event_type.to_string()).increment(1);
}

pub fn record_threshold_exceeded(event_type: &str) {
    metrics::counter!("guard_threshold_exceeded_total", "event_type" => event_type.to_string()).increment(1);
}

pub fn record_signature_rejection(reason: &'static str) {
    metrics::counter!("guard_signature_rejections_total", "reason" => reason).increment(1);
}

pub fn record_access_denied() {
    metrics::counter!("guard_access_denied_total").increment(1);
}

pub fn set_tracked_windows(count: usize) {
    metrics::gauge!("guard_tracked_windows").set(count as f64);
}
