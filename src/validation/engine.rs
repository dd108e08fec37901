//! Rule-set registry and evaluation.
//!
//! # Evaluation order
//! ```text
//! for each field group (first-declaration order):
//!     resolve path → targets (wildcards fan out)
//!     for each target:
//!         required?  blank → violation, stop
//!         absent     → only absent-aware custom rules
//!         checks     → every failure, declaration order
//!         customs    → every failure, declaration order
//! ```
//!
//! # Design Decisions
//! - Registry is frozen at startup; lookups are lock-free reads
//! - `required` is the only rule that short-circuits a target
//! - Custom predicate errors and panics become `rule evaluation error`

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::observability::metrics;
use crate::validation::error::ConfigurationError;
use crate::validation::path::ResolvedField;
use crate::validation::predicates;
use crate::validation::result::{ValidationResult, Violation};
use crate::validation::rule::{CustomContext, FieldGroup, FieldRule, RuleKind, RuleSet};
use crate::validation::rulesets;

/// Message recorded when a custom predicate fails to evaluate.
pub const RULE_EVALUATION_ERROR: &str = "rule evaluation error";

/// Immutable registry of rule sets plus the evaluator.
#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    rule_sets: HashMap<String, Arc<RuleSet>>,
    order: Vec<String>,
}

impl ValidationEngine {
    /// Register the given rule sets. Duplicate names are rejected.
    pub fn new(rule_sets: impl IntoIterator<Item = RuleSet>) -> Result<Self, ConfigurationError> {
        let mut engine = Self::default();
        for rule_set in rule_sets {
            let name = rule_set.name().to_string();
            if engine.rule_sets.contains_key(&name) {
                return Err(ConfigurationError::DuplicateRuleSet(name));
            }
            engine.order.push(name.clone());
            engine.rule_sets.insert(name, Arc::new(rule_set));
        }
        Ok(engine)
    }

    /// Engine holding the site's built-in rule sets.
    pub fn with_builtin_rule_sets() -> Result<Self, ConfigurationError> {
        Self::new(rulesets::builtin()?)
    }

    /// Registered names in registration order.
    pub fn rule_set_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn rule_set(&self, name: &str) -> Option<&RuleSet> {
        self.rule_sets.get(name).map(Arc::as_ref)
    }

    /// Evaluate `rule_set` against `payload`.
    ///
    /// Only an unknown rule-set name is an error; every payload problem is
    /// reported as a violation.
    pub fn evaluate(&self, rule_set: &str, payload: &Value) -> Result<ValidationResult, ConfigurationError> {
        let rules = self
            .rule_sets
            .get(rule_set)
            .ok_or_else(|| ConfigurationError::UnknownRuleSet(rule_set.to_string()))?;

        let result = evaluate_rule_set(rules, payload);

        metrics::record_validation(rule_set, result.is_valid());
        tracing::debug!(
            rule_set = %rule_set,
            valid = result.is_valid(),
            violations = result.violations().len(),
            "Payload evaluated"
        );

        Ok(result)
    }
}

/// Evaluate one rule set. Pure over its inputs.
pub fn evaluate_rule_set(rules: &RuleSet, payload: &Value) -> ValidationResult {
    let mut violations = Vec::new();
    for group in rules.groups() {
        for target in group.path.resolve(payload) {
            evaluate_target(rules.name(), group, &target, payload, &mut violations);
        }
    }
    ValidationResult::from_violations(violations)
}

fn evaluate_target(
    rule_set: &str,
    group: &FieldGroup,
    target: &ResolvedField<'_>,
    payload: &Value,
    violations: &mut Vec<Violation>,
) {
    let value = target.value.filter(|v| !v.is_null());

    if let Some(message) = &group.required {
        if predicates::is_blank(value) {
            violations.push(Violation::new(&target.path, message));
            return;
        }
    }

    let ctx = CustomContext {
        field_path: &target.path,
        value,
        payload,
    };

    let Some(present) = value else {
        violations.extend(
            group
                .customs
                .iter()
                .filter(|rule| matches!(&rule.kind, RuleKind::Custom(c) if c.evaluate_absent))
                .filter_map(|rule| run_custom(rule_set, rule, &ctx)),
        );
        return;
    };

    violations.extend(
        group
            .checks
            .iter()
            .filter(|rule| !check_value(&rule.kind, present))
            .map(|rule| Violation::new(&target.path, &rule.message)),
    );
    violations.extend(group.customs.iter().filter_map(|rule| run_custom(rule_set, rule, &ctx)));
}

/// Run a custom rule, converting failures into a violation.
fn run_custom(rule_set: &str, rule: &FieldRule, ctx: &CustomContext<'_>) -> Option<Violation> {
    let RuleKind::Custom(custom) = &rule.kind else {
        return None;
    };

    match panic::catch_unwind(AssertUnwindSafe(|| (custom.check)(ctx))) {
        Ok(Ok(true)) => None,
        Ok(Ok(false)) => Some(Violation::new(ctx.field_path, &rule.message)),
        Ok(Err(e)) => {
            tracing::warn!(
                rule_set = %rule_set,
                field = %ctx.field_path,
                error = %e,
                "Custom rule failed to evaluate"
            );
            metrics::record_rule_evaluation_error(rule_set);
            Some(Violation::new(ctx.field_path, RULE_EVALUATION_ERROR))
        }
        Err(_) => {
            tracing::error!(
                rule_set = %rule_set,
                field = %ctx.field_path,
                "Custom rule panicked"
            );
            metrics::record_rule_evaluation_error(rule_set);
            Some(Violation::new(ctx.field_path, RULE_EVALUATION_ERROR))
        }
    }
}

/// Single-field check against a present value.
fn check_value(kind: &RuleKind, value: &Value) -> bool {
    match kind {
        RuleKind::Required | RuleKind::Custom(_) => true,
        RuleKind::Length { min, max } => predicates::as_text(value).is_some_and(|text| {
            let len = text.chars().count();
            min.is_none_or(|min| len >= min) && max.is_none_or(|max| len <= max)
        }),
        RuleKind::Pattern(regex) => text_matches(regex, value),
        RuleKind::OneOf(options) => {
            predicates::as_text(value).is_some_and(|text| options.iter().any(|o| *o == text))
        }
        RuleKind::IsEmail => predicates::as_text(value).is_some_and(|t| predicates::is_email(&t)),
        RuleKind::IsIsoDate => predicates::as_text(value).is_some_and(|t| predicates::parse_iso8601(&t).is_some()),
        RuleKind::IsBoolean => predicates::is_boolean(value),
        RuleKind::IsInt { min, max } => predicates::as_integer(value)
            .is_some_and(|n| min.is_none_or(|min| n >= min) && max.is_none_or(|max| n <= max)),
        RuleKind::IsFloat { min, max } => predicates::as_float(value)
            .is_some_and(|n| min.is_none_or(|min| n >= min) && max.is_none_or(|max| n <= max)),
        RuleKind::IsUrl => predicates::as_text(value).is_some_and(|t| predicates::is_http_url(&t)),
        RuleKind::IsArray { max } => match value {
            Value::Array(items) => max.is_none_or(|max| items.len() <= max),
            _ => false,
        },
    }
}

fn text_matches(regex: &Regex, value: &Value) -> bool {
    predicates::as_text(value).is_some_and(|text| regex.is_match(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::error::RuleEvaluationError;
    use serde_json::json;

    fn engine(rule_set: RuleSet) -> ValidationEngine {
        ValidationEngine::new([rule_set]).unwrap()
    }

    fn messages(result: &ValidationResult) -> Vec<(&str, &str)> {
        result
            .violations()
            .iter()
            .map(|v| (v.field_path.as_str(), v.message.as_str()))
            .collect()
    }

    #[test]
    fn test_unknown_rule_set_is_configuration_error() {
        let engine = ValidationEngine::default();
        let err = engine.evaluate("event.delete", &json!({})).unwrap_err();
        assert_eq!(err, ConfigurationError::UnknownRuleSet("event.delete".into()));
    }

    #[test]
    fn test_duplicate_rule_set_rejected() {
        let a = RuleSet::builder("x").build().unwrap();
        let b = RuleSet::builder("x").build().unwrap();
        assert_eq!(
            ValidationEngine::new([a, b]).unwrap_err(),
            ConfigurationError::DuplicateRuleSet("x".into())
        );
    }

    #[test]
    fn test_required_short_circuits_field() {
        let engine = engine(
            RuleSet::builder("s")
                .field("name", |f| {
                    f.required("Name is required")
                        .length(3, 10, "Name length")
                        .custom("Name custom", |_| Ok(false))
                })
                .build()
                .unwrap(),
        );

        for payload in [json!({}), json!({ "name": null }), json!({ "name": "   " })] {
            let result = engine.evaluate("s", &payload).unwrap();
            assert_eq!(messages(&result), vec![("name", "Name is required")]);
        }
    }

    #[test]
    fn test_absent_optional_field_is_skipped() {
        let engine = engine(
            RuleSet::builder("s")
                .field("phone", |f| f.length(10, 15, "Phone length").pattern("^[0-9]+$", "Phone digits"))
                .field("venue.capacity", |f| f.int_range(Some(1), Some(10), "Capacity"))
                .build()
                .unwrap(),
        );
        let result = engine.evaluate("s", &json!({ "venue": {} })).unwrap();
        assert!(result.is_valid());
    }

    #[test]
    fn test_length_uses_trimmed_value() {
        let engine = engine(
            RuleSet::builder("s")
                .field("title", |f| f.length(5, 5, "Exactly five"))
                .build()
                .unwrap(),
        );
        assert!(engine.evaluate("s", &json!({ "title": "   hello   " })).unwrap().is_valid());
        assert!(!engine.evaluate("s", &json!({ "title": " hell " })).unwrap().is_valid());
    }

    #[test]
    fn test_length_counts_characters() {
        let engine = engine(
            RuleSet::builder("s")
                .field("name", |f| f.length(2, 3, "Name length"))
                .build()
                .unwrap(),
        );
        assert!(engine.evaluate("s", &json!({ "name": "山田太" })).unwrap().is_valid());
    }

    #[test]
    fn test_numeric_bounds_are_inclusive() {
        let engine = engine(
            RuleSet::builder("s")
                .field("capacity", |f| f.int_range(Some(1), Some(10_000), "Capacity"))
                .field("rating", |f| f.float_range(Some(1.0), Some(5.0), "Rating"))
                .build()
                .unwrap(),
        );

        for (capacity, rating) in [(json!(1), json!(1.0)), (json!(10_000), json!(5)), (json!("42"), json!("2.5"))] {
            let result = engine
                .evaluate("s", &json!({ "capacity": capacity, "rating": rating }))
                .unwrap();
            assert!(result.is_valid(), "{:?}", result);
        }

        let result = engine
            .evaluate("s", &json!({ "capacity": 0, "rating": 5.01 }))
            .unwrap();
        assert_eq!(messages(&result), vec![("capacity", "Capacity"), ("rating", "Rating")]);
    }

    #[test]
    fn test_every_failing_rule_reports() {
        let engine = engine(
            RuleSet::builder("s")
                .field("title", |f| {
                    f.length(5, 100, "Title length")
                        .pattern("^[a-z]+$", "Title characters")
                        .custom("Title custom", |_| Ok(false))
                })
                .build()
                .unwrap(),
        );
        let result = engine.evaluate("s", &json!({ "title": "A!" })).unwrap();
        assert_eq!(
            messages(&result),
            vec![("title", "Title length"), ("title", "Title characters"), ("title", "Title custom")]
        );

        let result = engine.evaluate("s", &json!({ "title": "abcdef" })).unwrap();
        assert_eq!(messages(&result), vec![("title", "Title custom")]);
    }

    #[test]
    fn test_rules_sharing_a_message_report_once() {
        let engine = engine(
            RuleSet::builder("s")
                .field("title", |f| f.length(5, 10, "Bad title").pattern("^[a-z]+$", "Bad title"))
                .build()
                .unwrap(),
        );
        let result = engine.evaluate("s", &json!({ "title": "A!" })).unwrap();
        assert_eq!(messages(&result), vec![("title", "Bad title")]);
    }

    #[test]
    fn test_large_wildcard_arrays_stay_linear() {
        let engine = engine(
            RuleSet::builder("s")
                .field("tags.*", |f| f.length(1, 30, "Bad tag").pattern("^[a-z]+$", "Bad tag"))
                .build()
                .unwrap(),
        );
        let payload = json!({ "tags": vec![""; 100_000] });

        let started = std::time::Instant::now();
        let result = engine.evaluate("s", &payload).unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(10), "took {:?}", started.elapsed());

        assert_eq!(result.violations().len(), 100_000);
        assert_eq!(result.violations()[0].field_path, "tags[0]");
        assert_eq!(result.violations()[99_999].field_path, "tags[99999]");
    }

    #[test]
    fn test_wildcard_reports_offending_element() {
        let engine = engine(
            RuleSet::builder("s")
                .field("tags.*", |f| f.length(1, 30, "Each tag must be between 1 and 30 characters"))
                .build()
                .unwrap(),
        );
        let result = engine.evaluate("s", &json!({ "tags": ["ok", ""] })).unwrap();
        assert_eq!(
            messages(&result),
            vec![("tags[1]", "Each tag must be between 1 and 30 characters")]
        );

        // Absent array behaves as an absent field
        assert!(engine.evaluate("s", &json!({})).unwrap().is_valid());
    }

    #[test]
    fn test_wildcard_required_on_absent_array() {
        let engine = engine(
            RuleSet::builder("s")
                .field("materials.*.url", |f| f.required("Material URL is required"))
                .build()
                .unwrap(),
        );
        let result = engine.evaluate("s", &json!({})).unwrap();
        assert_eq!(messages(&result), vec![("materials.*.url", "Material URL is required")]);

        let result = engine
            .evaluate("s", &json!({ "materials": [{ "url": "https://x.example" }, {}] }))
            .unwrap();
        assert_eq!(messages(&result), vec![("materials[1].url", "Material URL is required")]);
    }

    #[test]
    fn test_custom_sees_payload_and_runs_after_checks() {
        let engine = engine(
            RuleSet::builder("s")
                .field("endDate", |f| {
                    f.custom("End date must be after start date", |ctx| {
                        let end = ctx.text().and_then(|t| predicates::parse_iso8601(&t));
                        let start = ctx
                            .field("eventDate")
                            .and_then(predicates::as_text)
                            .and_then(|t| predicates::parse_iso8601(&t));
                        Ok(match (start, end) {
                            (Some(start), Some(end)) => end > start,
                            _ => true,
                        })
                    })
                    .iso_date("End date must be a valid ISO 8601 date")
                })
                .build()
                .unwrap(),
        );

        let result = engine
            .evaluate("s", &json!({ "eventDate": "2030-01-02", "endDate": "2030-01-01" }))
            .unwrap();
        assert_eq!(messages(&result), vec![("endDate", "End date must be after start date")]);

        // Declared first but runs after the single-field check
        let result = engine
            .evaluate("s", &json!({ "eventDate": "2030-01-02", "endDate": "soon" }))
            .unwrap();
        assert_eq!(messages(&result), vec![("endDate", "End date must be a valid ISO 8601 date")]);
    }

    #[test]
    fn test_custom_even_if_absent() {
        let engine = engine(
            RuleSet::builder("s")
                .field("venue.onlineUrl", |f| {
                    f.custom_even_if_absent("Online URL is required when event is online", |ctx| {
                        let online = ctx.field("venue.online").is_some_and(predicates::is_truthy);
                        Ok(!online || !predicates::is_blank(ctx.value))
                    })
                })
                .build()
                .unwrap(),
        );

        let result = engine.evaluate("s", &json!({ "venue": { "online": true } })).unwrap();
        assert_eq!(
            messages(&result),
            vec![("venue.onlineUrl", "Online URL is required when event is online")]
        );
        assert!(engine.evaluate("s", &json!({ "venue": { "online": false } })).unwrap().is_valid());
    }

    #[test]
    fn test_custom_errors_and_panics_are_absorbed() {
        let engine = engine(
            RuleSet::builder("s")
                .field("a", |f| f.custom("a failed", |_| Err(RuleEvaluationError::new("backend down"))))
                .field("b", |f| f.custom("b failed", |_| panic!("predicate bug")))
                .field("c", |f| f.required("c is required"))
                .build()
                .unwrap(),
        );

        let result = engine
            .evaluate("s", &json!({ "a": 1, "b": 2 }))
            .unwrap();
        assert!(!result.is_valid());
        assert_eq!(
            messages(&result),
            vec![
                ("a", RULE_EVALUATION_ERROR),
                ("b", RULE_EVALUATION_ERROR),
                ("c", "c is required"),
            ]
        );
    }

    #[test]
    fn test_non_scalar_fails_string_rules() {
        let engine = engine(
            RuleSet::builder("s")
                .field("title", |f| f.length(1, 10, "Title length"))
                .field("tags", |f| f.array(Some(2), "Tags must be an array with maximum 2 items"))
                .build()
                .unwrap(),
        );
        let result = engine
            .evaluate("s", &json!({ "title": { "nested": true }, "tags": ["a", "b", "c"] }))
            .unwrap();
        assert_eq!(
            messages(&result),
            vec![
                ("title", "Title length"),
                ("tags", "Tags must be an array with maximum 2 items"),
            ]
        );
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let engine = ValidationEngine::with_builtin_rule_sets().unwrap();
        let payload = json!({ "name": "Jo", "email": "nope", "privacyConsent": false });
        let first = engine.evaluate("participant.register", &payload).unwrap();
        let second = engine.evaluate("participant.register", &payload).unwrap();
        assert_eq!(first, second);
    }
}
