//! Validation results.

use std::collections::HashSet;

use serde::Serialize;

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Concrete path of the offending value (`title`, `tags[1]`).
    pub field_path: String,
    /// Human-readable message from the rule.
    pub message: String,
}

impl Violation {
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field_path: field_path.into(),
            message: message.into(),
        }
    }
}

/// Outcome of evaluating one rule set against one payload.
///
/// Violations keep rule declaration order. Only exact duplicates are
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    is_valid: bool,
    violations: Vec<Violation>,
}

impl ValidationResult {
    pub(crate) fn from_violations(violations: Vec<Violation>) -> Self {
        let mut seen = HashSet::with_capacity(violations.len());
        let unique: Vec<Violation> = violations
            .into_iter()
            .filter(|violation| seen.insert(violation.clone()))
            .collect();
        Self {
            is_valid: unique.is_empty(),
            violations: unique,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Violations recorded against one concrete path.
    pub fn violations_for<'a>(&'a self, field_path: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations
            .iter()
            .filter(move |v| v.field_path == field_path)
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_duplicates_are_suppressed_in_order() {
        let result = ValidationResult::from_violations(vec![
            Violation::new("title", "too short"),
            Violation::new("email", "invalid"),
            Violation::new("title", "too short"),
            Violation::new("title", "bad characters"),
        ]);

        assert!(!result.is_valid());
        let paths: Vec<_> = result
            .violations()
            .iter()
            .map(|v| (v.field_path.as_str(), v.message.as_str()))
            .collect();
        assert_eq!(
            paths,
            vec![
                ("title", "too short"),
                ("email", "invalid"),
                ("title", "bad characters"),
            ]
        );
        assert_eq!(result.violations_for("title").count(), 2);
    }

    #[test]
    fn test_duplicate_suppression_on_large_input() {
        let violations: Vec<Violation> = (0..50_000)
            .flat_map(|i| {
                let path = format!("tags[{i}]");
                [Violation::new(path.clone(), "bad tag"), Violation::new(path, "bad tag")]
            })
            .collect();

        let result = ValidationResult::from_violations(violations);
        assert_eq!(result.violations().len(), 50_000);
        assert_eq!(result.violations()[49_999].field_path, "tags[49999]");
    }

    #[test]
    fn test_serializes_camel_case() {
        let result = ValidationResult::from_violations(vec![Violation::new("name", "required")]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["isValid"], false);
        assert_eq!(json["violations"][0]["fieldPath"], "name");
    }
}
