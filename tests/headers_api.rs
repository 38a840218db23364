mod common;

use axum::http::{Method, StatusCode};
use common::{send, test_app, test_app_with};
use identity_api::config::Environment;
use tower::ServiceExt;

fn header<'a>(reply: &'a common::Reply, name: &str) -> Option<&'a str> {
    reply.headers.get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn every_response_gets_a_request_id_and_timing() {
    let t = test_app();
    let first = send(&t.app, Method::GET, "/health", None, None).await;
    let second = send(&t.app, Method::GET, "/health", None, None).await;

    let id = header(&first, "x-request-id").expect("request id");
    assert!(uuid::Uuid::parse_str(id).is_ok(), "{id}");
    assert_ne!(Some(id), header(&second, "x-request-id"));

    let took = header(&first, "x-response-time").expect("response time");
    let seconds = took.strip_suffix('s').expect("seconds suffix");
    assert!(seconds.parse::<f64>().is_ok(), "{took}");
    assert_eq!(seconds.split('.').nth(1).map(str::len), Some(3), "{took}");
}

#[tokio::test]
async fn incoming_request_id_is_echoed() {
    let t = test_app();
    let req = axum::http::Request::builder()
        .method("GET")
        .uri("/trpc/health.check")
        .header("x-request-id", "req-from-gateway-42")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = t.app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-from-gateway-42")
    );
}

#[tokio::test]
async fn security_headers_are_set_on_success_and_error() {
    let t = test_app();
    let ok = send(&t.app, Method::GET, "/health", None, None).await;
    let rejected = send(
        &t.app,
        Method::GET,
        "/health",
        Some("https://evil.example.com"),
        None,
    )
    .await;
    let missing = send(&t.app, Method::POST, "/trpc/nope", None, None).await;
    assert_eq!(rejected.status, StatusCode::FORBIDDEN);
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    for reply in [&ok, &rejected, &missing] {
        assert_eq!(header(reply, "x-content-type-options"), Some("nosniff"));
        assert_eq!(header(reply, "x-frame-options"), Some("DENY"));
        assert_eq!(header(reply, "x-xss-protection"), Some("1; mode=block"));
        assert_eq!(
            header(reply, "referrer-policy"),
            Some("strict-origin-when-cross-origin")
        );
        assert_eq!(
            header(reply, "cache-control"),
            Some("no-cache, no-store, must-revalidate")
        );
        assert_eq!(header(reply, "pragma"), Some("no-cache"));
        assert_eq!(header(reply, "expires"), Some("0"));
        assert!(header(reply, "x-request-id").is_some());
    }
    assert_eq!(
        header(&ok, "content-security-policy"),
        Some("default-src 'self' 'unsafe-inline' 'unsafe-eval'")
    );
}

#[tokio::test]
async fn production_gets_strict_csp_and_hsts_preload() {
    let t = test_app_with(|cfg| cfg.environment = Environment::Production);
    let reply = send(&t.app, Method::GET, "/health", None, None).await;
    assert_eq!(header(&reply, "content-security-policy"), Some("default-src 'self'"));
    assert_eq!(
        header(&reply, "strict-transport-security"),
        Some("max-age=31536000; includeSubDomains; preload")
    );
}

#[tokio::test]
async fn browsers_may_read_the_tracing_headers() {
    let t = test_app();
    let reply = send(
        &t.app,
        Method::GET,
        "/health",
        Some("https://app.example.com"),
        None,
    )
    .await;
    let exposed = header(&reply, "access-control-expose-headers")
        .unwrap_or_default()
        .to_ascii_lowercase();
    assert!(exposed.contains("x-request-id"), "{exposed}");
    assert!(exposed.contains("x-response-time"), "{exposed}");
}
