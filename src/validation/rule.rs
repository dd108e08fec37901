//! Rule definitions and the rule-set builder.
//!
//! A [`RuleSet`] is an immutable, named, ordered list of field rules. Rule
//! parameters are checked when the set is built, so a malformed rule never
//! reaches request handling.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::validation::error::{ConfigurationError, RuleEvaluationError};
use crate::validation::path::FieldPath;

/// Input handed to a custom predicate.
#[derive(Debug, Clone, Copy)]
pub struct CustomContext<'a> {
    /// Concrete path of the value under test.
    pub field_path: &'a str,
    /// The resolved value, `None` when absent.
    pub value: Option<&'a Value>,
    /// The whole payload, for cross-field rules.
    pub payload: &'a Value,
}

impl<'a> CustomContext<'a> {
    /// The resolved value as trimmed text, if it is a scalar.
    pub fn text(&self) -> Option<String> {
        self.value.and_then(crate::validation::predicates::as_text)
    }

    /// Look up another field of the payload by dotted path.
    pub fn field(&self, path: &str) -> Option<&'a Value> {
        path.split('.')
            .try_fold(self.payload, |value, key| value.get(key))
            .filter(|v| !v.is_null())
    }
}

/// Signature of a custom predicate: `Ok(true)` passes, `Ok(false)` records
/// the rule's message, `Err` records `rule evaluation error`.
pub type CustomCheck =
    Arc<dyn Fn(&CustomContext<'_>) -> Result<bool, RuleEvaluationError> + Send + Sync>;

/// A caller-supplied predicate.
#[derive(Clone)]
pub struct CustomRule {
    pub(crate) check: CustomCheck,
    /// Run even when the field is absent (cross-field presence rules).
    pub(crate) evaluate_absent: bool,
}

impl fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomRule")
            .field("evaluate_absent", &self.evaluate_absent)
            .finish_non_exhaustive()
    }
}

/// The constraint a rule applies.
#[derive(Debug, Clone)]
pub enum RuleKind {
    Required,
    Length { min: Option<usize>, max: Option<usize> },
    Pattern(Regex),
    OneOf(Vec<String>),
    IsEmail,
    IsIsoDate,
    IsBoolean,
    IsInt { min: Option<i64>, max: Option<i64> },
    IsFloat { min: Option<f64>, max: Option<f64> },
    IsUrl,
    IsArray { max: Option<usize> },
    Custom(CustomRule),
}

impl RuleKind {
    pub fn is_custom(&self) -> bool {
        matches!(self, RuleKind::Custom(_))
    }

    /// Short name used in logs and admin listings.
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::Required => "required",
            RuleKind::Length { .. } => "length",
            RuleKind::Pattern(_) => "pattern",
            RuleKind::OneOf(_) => "oneOf",
            RuleKind::IsEmail => "isEmail",
            RuleKind::IsIsoDate => "isISODate",
            RuleKind::IsBoolean => "isBoolean",
            RuleKind::IsInt { .. } => "isInt",
            RuleKind::IsFloat { .. } => "isFloat",
            RuleKind::IsUrl => "isURL",
            RuleKind::IsArray { .. } => "isArray",
            RuleKind::Custom(_) => "custom",
        }
    }
}

/// One constraint on one field.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub kind: RuleKind,
    pub message: String,
}

/// All rules declared for one field path, split the way they run.
#[derive(Debug, Clone)]
pub struct FieldGroup {
    pub path: FieldPath,
    /// Message of the `required` rule, if any.
    pub required: Option<String>,
    /// Single-field rules in declaration order.
    pub checks: Vec<FieldRule>,
    /// Custom rules in declaration order, run after `checks`.
    pub customs: Vec<FieldRule>,
}

/// A named, immutable rule set.
#[derive(Debug, Clone)]
pub struct RuleSet {
    name: String,
    groups: Vec<FieldGroup>,
    rule_count: usize,
}

impl RuleSet {
    pub fn builder(name: impl Into<String>) -> RuleSetBuilder {
        RuleSetBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field groups in order of first declaration.
    pub fn groups(&self) -> &[FieldGroup] {
        &self.groups
    }

    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    pub fn field_paths(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.path.as_str())
    }
}

/// Builder for [`RuleSet`].
///
/// ```
/// use circle_guard::validation::RuleSet;
///
/// let rules = RuleSet::builder("talk.rate")
///     .field("rating", |f| f
///         .required("Rating is required")
///         .float_range(Some(1.0), Some(5.0), "Rating must be between 1 and 5"))
///     .build()
///     .unwrap();
/// assert_eq!(rules.rule_count(), 2);
/// ```
#[derive(Debug)]
pub struct RuleSetBuilder {
    name: String,
    fields: Vec<FieldRules>,
}

impl RuleSetBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Declare rules for `path`. Repeated paths append to the same field.
    pub fn field(mut self, path: &str, define: impl FnOnce(FieldRules) -> FieldRules) -> Self {
        self.fields.push(define(FieldRules::new(path)));
        self
    }

    /// Check every rule and freeze the set.
    pub fn build(self) -> Result<RuleSet, ConfigurationError> {
        if self.name.trim().is_empty() {
            return Err(ConfigurationError::MalformedRule {
                rule_set: self.name,
                path: String::new(),
                reason: "rule set name is empty".to_string(),
            });
        }

        let mut groups: Vec<FieldGroup> = Vec::new();
        let mut rule_count = 0;

        for field in self.fields {
            let malformed = |reason: String| ConfigurationError::MalformedRule {
                rule_set: self.name.clone(),
                path: field.path.clone(),
                reason,
            };

            if let Some(reason) = field.error {
                return Err(malformed(reason));
            }
            let path = FieldPath::parse(&field.path)?;

            let index = match groups.iter().position(|g| g.path == path) {
                Some(index) => index,
                None => {
                    groups.push(FieldGroup {
                        path,
                        required: None,
                        checks: Vec::new(),
                        customs: Vec::new(),
                    });
                    groups.len() - 1
                }
            };
            let group = &mut groups[index];

            for rule in field.rules {
                if rule.message.trim().is_empty() {
                    return Err(malformed(format!("{} rule has an empty message", rule.kind.name())));
                }
                rule_count += 1;
                match rule.kind {
                    RuleKind::Required => {
                        if group.required.is_some() {
                            return Err(malformed("required declared twice".to_string()));
                        }
                        group.required = Some(rule.message);
                    }
                    RuleKind::Custom(_) => group.customs.push(rule),
                    _ => group.checks.push(rule),
                }
            }
        }

        Ok(RuleSet {
            name: self.name,
            groups,
            rule_count,
        })
    }
}

/// Rules for one field, collected by [`RuleSetBuilder::field`].
///
/// Parameter problems are remembered and reported by `build`.
#[derive(Debug)]
pub struct FieldRules {
    path: String,
    rules: Vec<FieldRule>,
    error: Option<String>,
}

impl FieldRules {
    fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            rules: Vec::new(),
            error: None,
        }
    }

    fn push(mut self, kind: RuleKind, message: &str) -> Self {
        self.rules.push(FieldRule {
            kind,
            message: message.to_string(),
        });
        self
    }

    fn fail(mut self, reason: String) -> Self {
        if self.error.is_none() {
            self.error = Some(reason);
        }
        self
    }

    pub fn required(self, message: &str) -> Self {
        self.push(RuleKind::Required, message)
    }

    /// Trimmed length in characters, inclusive bounds.
    pub fn length(self, min: usize, max: usize, message: &str) -> Self {
        if min > max {
            return self.fail(format!("length min {} exceeds max {}", min, max));
        }
        self.push(
            RuleKind::Length {
                min: Some(min),
                max: Some(max),
            },
            message,
        )
    }

    pub fn max_length(self, max: usize, message: &str) -> Self {
        self.push(RuleKind::Length { min: None, max: Some(max) }, message)
    }

    pub fn pattern(self, pattern: &str, message: &str) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => self.push(RuleKind::Pattern(regex), message),
            Err(e) => self.fail(format!("invalid pattern: {}", e)),
        }
    }

    pub fn one_of(self, options: &[&str], message: &str) -> Self {
        if options.is_empty() {
            return self.fail("oneOf needs at least one option".to_string());
        }
        let options = options.iter().map(|s| s.to_string()).collect();
        self.push(RuleKind::OneOf(options), message)
    }

    pub fn email(self, message: &str) -> Self {
        self.push(RuleKind::IsEmail, message)
    }

    pub fn iso_date(self, message: &str) -> Self {
        self.push(RuleKind::IsIsoDate, message)
    }

    pub fn boolean(self, message: &str) -> Self {
        self.push(RuleKind::IsBoolean, message)
    }

    /// Integer with inclusive bounds.
    pub fn int_range(self, min: Option<i64>, max: Option<i64>, message: &str) -> Self {
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return self.fail(format!("isInt min {} exceeds max {}", min, max));
            }
        }
        self.push(RuleKind::IsInt { min, max }, message)
    }

    /// Float with inclusive bounds.
    pub fn float_range(self, min: Option<f64>, max: Option<f64>, message: &str) -> Self {
        if min.is_some_and(|v| !v.is_finite()) || max.is_some_and(|v| !v.is_finite()) {
            return self.fail("isFloat bounds must be finite".to_string());
        }
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return self.fail(format!("isFloat min {} exceeds max {}", min, max));
            }
        }
        self.push(RuleKind::IsFloat { min, max }, message)
    }

    pub fn url(self, message: &str) -> Self {
        self.push(RuleKind::IsUrl, message)
    }

    /// Array holding at most `max` items.
    pub fn array(self, max: Option<usize>, message: &str) -> Self {
        self.push(RuleKind::IsArray { max }, message)
    }

    /// Custom predicate, skipped when the field is absent.
    pub fn custom<F>(self, message: &str, check: F) -> Self
    where
        F: Fn(&CustomContext<'_>) -> Result<bool, RuleEvaluationError> + Send + Sync + 'static,
    {
        self.push(
            RuleKind::Custom(CustomRule {
                check: Arc::new(check),
                evaluate_absent: false,
            }),
            message,
        )
    }

    /// Custom predicate that also runs when the field is absent.
    pub fn custom_even_if_absent<F>(self, message: &str, check: F) -> Self
    where
        F: Fn(&CustomContext<'_>) -> Result<bool, RuleEvaluationError> + Send + Sync + 'static,
    {
        self.push(
            RuleKind::Custom(CustomRule {
                check: Arc::new(check),
                evaluate_absent: true,
            }),
            message,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_groups_by_path_in_declaration_order() {
        let rules = RuleSet::builder("sample")
            .field("title", |f| f.required("title required").length(5, 100, "title length"))
            .field("venue.name", |f| f.length(2, 100, "venue length"))
            .field("title", |f| f.custom("title custom", |_| Ok(true)))
            .build()
            .unwrap();

        let paths: Vec<_> = rules.field_paths().collect();
        assert_eq!(paths, vec!["title", "venue.name"]);
        assert_eq!(rules.rule_count(), 4);

        let title = &rules.groups()[0];
        assert_eq!(title.required.as_deref(), Some("title required"));
        assert_eq!(title.checks.len(), 1);
        assert_eq!(title.customs.len(), 1);
    }

    #[test]
    fn test_malformed_rules_fail_at_build() {
        let cases = [
            RuleSet::builder("a").field("x", |f| f.length(10, 2, "m")).build(),
            RuleSet::builder("a").field("x", |f| f.int_range(Some(5), Some(1), "m")).build(),
            RuleSet::builder("a").field("x", |f| f.float_range(Some(f64::NAN), None, "m")).build(),
            RuleSet::builder("a").field("x", |f| f.pattern("([", "m")).build(),
            RuleSet::builder("a").field("x", |f| f.one_of(&[], "m")).build(),
            RuleSet::builder("a").field("x", |f| f.required("")).build(),
            RuleSet::builder("a").field("x", |f| f.required("a").required("b")).build(),
            RuleSet::builder("").field("x", |f| f.required("m")).build(),
        ];
        for case in cases {
            assert!(matches!(case, Err(ConfigurationError::MalformedRule { .. })), "{case:?}");
        }
    }

    #[test]
    fn test_invalid_path_fails_at_build() {
        let err = RuleSet::builder("a")
            .field("tags..name", |f| f.required("m"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidFieldPath { .. }));
    }

    #[test]
    fn test_context_field_lookup() {
        let payload = serde_json::json!({ "venue": { "online": true, "name": null } });
        let ctx = CustomContext {
            field_path: "venue.onlineUrl",
            value: None,
            payload: &payload,
        };
        assert_eq!(ctx.field("venue.online"), Some(&serde_json::json!(true)));
        assert_eq!(ctx.field("venue.name"), None);
        assert_eq!(ctx.field("venue.missing.deeper"), None);
    }
}
