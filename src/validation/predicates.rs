//! Built-in value predicates used by the rule kinds.
//!
//! All string checks work on the trimmed value. Numbers and booleans are
//! checked through their string form; arrays and objects never pass a
//! string check.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;
use url::Url;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("invalid email pattern"));

/// Text form of a scalar value, trimmed. `None` for arrays and objects.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// True for absent, `null`, and whitespace-only strings.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

pub fn is_email(text: &str) -> bool {
    EMAIL_PATTERN.is_match(text)
}

/// Absolute `http`/`https` URL with a host.
pub fn is_http_url(text: &str) -> bool {
    if text.chars().any(char::is_whitespace) {
        return false;
    }
    match Url::parse(text) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}

/// Parse an ISO-8601 date or date-time.
///
/// Accepts RFC 3339 date-times, bare `YYYY-MM-DD` dates, and date-times
/// without an offset. Offset-less values are taken as UTC.
pub fn parse_iso8601(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Boolean, or one of `"true"`, `"false"`, `"1"`, `"0"`, or the numbers 0/1.
pub fn is_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::Number(n) => matches!(n.as_i64(), Some(0) | Some(1)),
        Value::String(s) => matches!(s.trim(), "true" | "false" | "1" | "0"),
        _ => false,
    }
}

/// Truthiness used by consent-style rules: `true`, `"true"`, `"1"`, `1`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => matches!(s.trim(), "true" | "1"),
        _ => false,
    }
}

/// Integer value, from a JSON integer, a whole float, or a numeric string.
pub fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Finite float value, from a JSON number or a numeric string.
pub fn as_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_email() {
        assert!(is_email("speaker@example.com"));
        assert!(!is_email("not-an-email"));
        assert!(!is_email("a b@example.com"));
        assert!(!is_email("a@example"));
    }

    #[test]
    fn test_http_url() {
        assert!(is_http_url("https://meet.example.com/room?id=1"));
        assert!(is_http_url("http://localhost:8080"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("https://"));
        assert!(!is_http_url("example.com"));
        assert!(!is_http_url("https://exa mple.com"));
    }

    #[test]
    fn test_iso8601_forms() {
        assert!(parse_iso8601("2030-05-01T18:30:00+09:00").is_some());
        assert!(parse_iso8601("2030-05-01T18:30:00Z").is_some());
        assert!(parse_iso8601("2030-05-01T18:30:00.250").is_some());
        assert!(parse_iso8601("2030-05-01T18:30").is_some());
        assert!(parse_iso8601("2030-05-01").is_some());
        assert!(parse_iso8601("2030-13-01").is_none());
        assert!(parse_iso8601("next friday").is_none());

        let offset = parse_iso8601("2030-05-01T09:00:00+09:00").unwrap();
        let utc = parse_iso8601("2030-05-01T00:00:00Z").unwrap();
        assert_eq!(offset, utc);
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(as_integer(&json!(42)), Some(42));
        assert_eq!(as_integer(&json!(" 7 ")), Some(7));
        assert_eq!(as_integer(&json!(3.0)), Some(3));
        assert_eq!(as_integer(&json!(3.5)), None);
        assert_eq!(as_integer(&json!(true)), None);
        assert_eq!(as_float(&json!("4.5")), Some(4.5));
        assert_eq!(as_float(&json!("NaN")), None);
    }

    #[test]
    fn test_boolean_forms() {
        assert!(is_boolean(&json!(false)));
        assert!(is_boolean(&json!("true")));
        assert!(is_boolean(&json!(0)));
        assert!(!is_boolean(&json!("yes")));
        assert!(!is_truthy(&json!(false)));
        assert!(is_truthy(&json!("1")));
    }

    #[test]
    fn test_blank() {
        assert!(is_blank(None));
        assert!(is_blank(Some(&json!(null))));
        assert!(is_blank(Some(&json!("   "))));
        assert!(!is_blank(Some(&json!(false))));
        assert!(!is_blank(Some(&json!(0))));
    }
}
