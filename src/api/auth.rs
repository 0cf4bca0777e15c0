//! HTTP basic auth for the webhook endpoints.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};

use super::routes::AppState;
use super::types::ErrorResponse;
use crate::config::BasicAuth;

const REALM: &str = "Basic realm=\"recipe-agent\"";

/// Decode `Authorization: Basic ...` into user and password.
fn credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

/// Byte comparison whose running time does not depend on where inputs differ.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Check the request headers against the configured credentials.
pub fn is_authorized(headers: &HeaderMap, auth: &BasicAuth) -> bool {
    let Some((user, password)) = credentials(headers) else {
        return false;
    };
    let user_ok = constant_time_eq(user.as_bytes(), auth.username.as_bytes());
    let password_ok = constant_time_eq(password.as_bytes(), auth.password.as_bytes());
    user_ok & password_ok
}

pub async fn require_basic_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if is_authorized(request.headers(), &state.config.auth) {
        return next.run(request).await;
    }

    tracing::warn!("Rejected unauthorized request to {}", request.uri().path());
    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "Unauthorized".to_string(),
        }),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(REALM));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn accepts_matching_credentials() {
        let auth = BasicAuth::new("signalwire", "s3cret");
        let value = format!("Basic {}", STANDARD.encode("signalwire:s3cret"));
        assert!(is_authorized(&headers(&value), &auth));
        let value = format!("basic {}", STANDARD.encode("signalwire:s3cret"));
        assert!(is_authorized(&headers(&value), &auth));
    }

    #[test]
    fn rejects_everything_else() {
        let auth = BasicAuth::new("signalwire", "s3cret");
        assert!(!is_authorized(&HeaderMap::new(), &auth));
        let wrong = format!("Basic {}", STANDARD.encode("signalwire:nope"));
        assert!(!is_authorized(&headers(&wrong), &auth));
        assert!(!is_authorized(&headers("Bearer s3cret"), &auth));
        assert!(!is_authorized(&headers("Basic !!!"), &auth));
    }

    #[test]
    fn comparison_checks_every_byte() {
        assert!(constant_time_eq(b"s3cret", b"s3cret"));
        assert!(!constant_time_eq(b"s3cret", b"s3creT"));
        assert!(!constant_time_eq(b"s3cret", b"s3cre"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn password_may_contain_colons() {
        let auth = BasicAuth::new("u", "a:b");
        let value = format!("Basic {}", STANDARD.encode("u:a:b"));
        assert!(is_authorized(&headers(&value), &auth));
    }
}
