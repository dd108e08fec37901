//! Heuristic scan for obviously hostile request content.
//!
//! Matches are reported as `suspiciousRequests` events; they never block a
//! request on their own.

use std::sync::LazyLock;

use regex::RegexSet;

static SUSPICIOUS_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"\.\./",
        r"(?i)<script",
        r"(?i)union.*select",
        r"(?i)javascript:",
        r"(?i)data:",
    ])
    .expect("invalid suspicious request pattern")
});

/// Labels for the patterns, index-aligned with the set.
const PATTERN_NAMES: &[&str] = &["path_traversal", "script_tag", "sql_union", "javascript_uri", "data_uri"];

/// Names of the hostile patterns found in `text`.
pub fn suspicious_patterns(text: &str) -> Vec<&'static str> {
    SUSPICIOUS_PATTERNS
        .matches(text)
        .into_iter()
        .filter_map(|i| PATTERN_NAMES.get(i).copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_common_attacks() {
        assert_eq!(suspicious_patterns("GET /files/../../etc/passwd"), vec!["path_traversal"]);
        assert_eq!(suspicious_patterns(r#"{"title":"<SCRIPT>alert(1)</script>"}"#), vec!["script_tag"]);
        assert_eq!(suspicious_patterns("q=1 UNION ALL SELECT password"), vec!["sql_union"]);
        assert_eq!(suspicious_patterns("javascript:alert(1)"), vec!["javascript_uri"]);
    }

    #[test]
    fn test_clean_text() {
        assert!(suspicious_patterns(r#"{"title":"Lightning talks vol. 3","tags":["rust"]}"#).is_empty());
    }
}
