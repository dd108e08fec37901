//! Validation error types.
//!
//! Payload problems never surface here: they become violations. These
//! errors describe broken rule definitions or predicate failures.

use thiserror::Error;

/// A rule-set definition or lookup problem.
///
/// Raised while rule sets are built and registered at startup, or when a
/// caller names a rule set that was never registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("unknown rule set `{0}`")]
    UnknownRuleSet(String),

    #[error("rule set `{0}` is registered twice")]
    DuplicateRuleSet(String),

    #[error("invalid field path `{path}`: {reason}")]
    InvalidFieldPath { path: String, reason: String },

    #[error("malformed rule on `{path}` in rule set `{rule_set}`: {reason}")]
    MalformedRule {
        rule_set: String,
        path: String,
        reason: String,
    },
}

/// Failure raised from inside a custom predicate.
///
/// The engine absorbs it into a single `rule evaluation error` violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct RuleEvaluationError(pub String);

impl RuleEvaluationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
