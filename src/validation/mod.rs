//! Declarative payload validation.
//!
//! # Responsibilities
//! - Describe per-endpoint rule sets with a builder ([`RuleSet`])
//! - Register them once at startup ([`ValidationEngine`])
//! - Evaluate JSON payloads into a [`ValidationResult`]
//!
//! # Data Flow
//! ```text
//! JSON body ─► strip_null_bytes ─► ValidationEngine::evaluate(rule_set)
//!                                        │
//!                                        ├─ FieldPath::resolve (wildcards fan out)
//!                                        ├─ required / checks / customs per target
//!                                        └─► ValidationResult { is_valid, violations }
//! ```
//!
//! # Design Decisions
//! - Rule sets are immutable values; evaluation never mutates the payload
//! - Payload problems are violations, never errors
//! - Only an unknown rule-set name surfaces as [`ConfigurationError`]

pub mod engine;
pub mod error;
pub mod path;
pub mod predicates;
pub mod result;
pub mod rule;
pub mod rulesets;
pub mod sanitize;

pub use engine::{ValidationEngine, RULE_EVALUATION_ERROR};
pub use error::{ConfigurationError, RuleEvaluationError};
pub use path::FieldPath;
pub use result::{ValidationResult, Violation};
pub use rule::{CustomContext, RuleKind, RuleSet, RuleSetBuilder};
pub use sanitize::strip_null_bytes;
