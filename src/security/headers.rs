//! Response security headers and HTTPS redirects.
//!
//! # Responsibilities
//! - Hardening headers on every response
//! - No-store caching on admin and auth paths
//! - Redirect target for plain-HTTP requests behind a TLS terminator
//!
//! # Design Decisions
//! - Only `X-Forwarded-Proto` decides whether a request was secure; the
//!   sidecar itself never terminates TLS

use axum::http::{HeaderName, HeaderValue};

const BASELINE: &[(&str, &str)] = &[
    ("permissions-policy", "geolocation=(), microphone=(), camera=()"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-download-options", "noopen"),
    ("x-dns-prefetch-control", "off"),
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
];

const NO_STORE: &[(&str, &str)] = &[
    ("cache-control", "no-store, no-cache, must-revalidate, private"),
    ("pragma", "no-cache"),
    ("expires", "0"),
];

/// Headers to attach to a response for `path`.
pub fn security_headers(path: &str) -> Vec<(HeaderName, HeaderValue)> {
    let extra: &[(&'static str, &'static str)] = if is_sensitive(path) { NO_STORE } else { &[] };
    BASELINE
        .iter()
        .chain(extra)
        .map(|&(name, value)| (HeaderName::from_static(name), HeaderValue::from_static(value)))
        .collect()
}

fn is_sensitive(path: &str) -> bool {
    path.contains("/admin") || path.contains("/auth")
}

/// `https://` URL to redirect to, or `None` when the request already
/// arrived over HTTPS or carries no usable host.
pub fn https_redirect_target(forwarded_proto: Option<&str>, host: Option<&str>, path_and_query: &str) -> Option<String> {
    let secure = forwarded_proto
        .and_then(|p| p.split(',').next())
        .is_some_and(|p| p.trim().eq_ignore_ascii_case("https"));
    if secure {
        return None;
    }
    let host = host.map(str::trim).filter(|h| !h.is_empty() && !h.contains(['/', ' ']))?;
    let path = if path_and_query.starts_with('/') { path_and_query } else { "/" };
    Some(format!("https://{}{}", host, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(headers: &[(HeaderName, HeaderValue)]) -> Vec<&str> {
        headers.iter().map(|(n, _)| n.as_str()).collect()
    }

    #[test]
    fn test_baseline_headers() {
        let headers = security_headers("/v1/validate/event.create");
        let names = names(&headers);
        assert!(names.contains(&"permissions-policy"));
        assert!(names.contains(&"x-frame-options"));
        assert!(names.contains(&"x-content-type-options"));
        assert!(!names.contains(&"cache-control"));
    }

    #[test]
    fn test_no_store_on_sensitive_paths() {
        for path in ["/admin/status", "/api/auth/login"] {
            let headers = security_headers(path);
            let cache = headers
                .iter()
                .find(|(n, _)| n.as_str() == "cache-control")
                .map(|(_, v)| v.to_str().unwrap());
            assert_eq!(cache, Some("no-store, no-cache, must-revalidate, private"));
        }
    }

    #[test]
    fn test_https_redirect_target() {
        assert_eq!(
            https_redirect_target(Some("http"), Some("circle.example.com"), "/v1/access/1.2.3.4?x=1"),
            Some("https://circle.example.com/v1/access/1.2.3.4?x=1".to_string())
        );
        assert_eq!(https_redirect_target(None, Some("circle.example.com"), "/"), Some("https://circle.example.com/".to_string()));
        assert_eq!(https_redirect_target(Some("https"), Some("circle.example.com"), "/"), None);
        assert_eq!(https_redirect_target(Some("HTTPS, http"), Some("a.example"), "/"), None);
        assert_eq!(https_redirect_target(Some("http"), None, "/"), None);
        assert_eq!(https_redirect_target(Some("http"), Some("evil.example/path"), "/"), None);
    }
}
