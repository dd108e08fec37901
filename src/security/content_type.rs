//! Content-Type enforcement for requests with bodies.

use axum::http::{Method, StatusCode};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentTypeError {
    #[error("Content-Type header is required")]
    Missing,

    #[error("Unsupported Media Type")]
    Unsupported,
}

impl ContentTypeError {
    pub fn status(&self) -> StatusCode {
        match self {
            ContentTypeError::Missing => StatusCode::BAD_REQUEST,
            ContentTypeError::Unsupported => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        }
    }
}

/// POST, PUT and PATCH must declare one of `allowed`. Parameters such as
/// `; charset=utf-8` are ignored. Other methods always pass.
pub fn check_content_type(
    method: &Method,
    content_type: Option<&str>,
    allowed: &[String],
) -> Result<(), ContentTypeError> {
    if !matches!(*method, Method::POST | Method::PUT | Method::PATCH) {
        return Ok(());
    }
    let content_type = content_type
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .ok_or(ContentTypeError::Missing)?;
    let essence = content_type.split(';').next().unwrap_or_default().trim();

    if allowed.iter().any(|a| a.eq_ignore_ascii_case(essence)) {
        Ok(())
    } else {
        Err(ContentTypeError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_only() -> Vec<String> {
        vec!["application/json".to_string()]
    }

    #[test]
    fn test_body_methods_need_allowed_type() {
        assert_eq!(
            check_content_type(&Method::POST, Some("application/json; charset=utf-8"), &json_only()),
            Ok(())
        );
        assert_eq!(check_content_type(&Method::PUT, None, &json_only()), Err(ContentTypeError::Missing));
        assert_eq!(
            check_content_type(&Method::PATCH, Some("text/plain"), &json_only()),
            Err(ContentTypeError::Unsupported)
        );
        assert_eq!(ContentTypeError::Unsupported.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn test_other_methods_pass() {
        assert_eq!(check_content_type(&Method::GET, None, &json_only()), Ok(()));
        assert_eq!(check_content_type(&Method::DELETE, Some("text/plain"), &json_only()), Ok(()));
    }
}
