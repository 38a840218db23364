use std::time::Instant;

use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::config::Environment;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const X_RESPONSE_TIME: HeaderName = HeaderName::from_static("x-response-time");

/// Adds `X-Response-Time: <seconds>s` (millisecond precision) to every response.
pub async fn stamp_response_time(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let mut res = next.run(req).await;
    let elapsed = format!("{:.3}s", started.elapsed().as_secs_f64());
    if let Ok(value) = HeaderValue::from_str(&elapsed) {
        res.headers_mut().insert(X_RESPONSE_TIME, value);
    }
    res
}

/// Response headers set on every reply, overriding whatever a handler set.
pub fn security_headers(env: Environment) -> Vec<(HeaderName, HeaderValue)> {
    let (csp, hsts) = match env {
        Environment::Production => (
            "default-src 'self'",
            "max-age=31536000; includeSubDomains; preload",
        ),
        Environment::Development | Environment::Test => (
            "default-src 'self' 'unsafe-inline' 'unsafe-eval'",
            "max-age=31536000; includeSubDomains",
        ),
    };

    vec![
        (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
        (header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block")),
        (header::STRICT_TRANSPORT_SECURITY, HeaderValue::from_static(hsts)),
        (
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ),
        (header::CONTENT_SECURITY_POLICY, HeaderValue::from_static(csp)),
        (
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ),
        (header::PRAGMA, HeaderValue::from_static("no-cache")),
        (header::EXPIRES, HeaderValue::from_static("0")),
    ]
}
