use std::{collections::HashSet, sync::Arc};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::error::ApiError;
use crate::middleware::{X_REQUEST_ID, X_RESPONSE_TIME};

/// Local dev servers that may always call the API.
pub const DEV_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:3001",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:3001",
    "http://127.0.0.1:5173",
];

const EXTENSION_SCHEME: &str = "chrome-extension://";

/// Which browser origins may call the API.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Arc<HashSet<String>>,
}

impl OriginPolicy {
    /// `web_urls` are the configured web app origins; dev origins are always added.
    pub fn new(web_urls: &[String]) -> Self {
        let allowed: HashSet<String> = web_urls
            .iter()
            .map(|u| u.trim_end_matches('/').to_string())
            .chain(DEV_ORIGINS.iter().map(|s| s.to_string()))
            .collect();
        Self {
            allowed: Arc::new(allowed),
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        if let Some(id) = origin.strip_prefix(EXTENSION_SCHEME) {
            return !id.is_empty();
        }
        self.allowed.contains(origin)
    }

    pub fn layer(&self) -> CorsLayer {
        let policy = self.clone();
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(
                move |origin: &HeaderValue, _parts: &axum::http::request::Parts| {
                    origin.to_str().map(|o| policy.allows(o)).unwrap_or(false)
                },
            ))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, X_REQUEST_ID])
            .expose_headers([X_REQUEST_ID, X_RESPONSE_TIME])
            .allow_credentials(true)
    }
}

/// Rejects requests whose `Origin` is not allowed. Requests without an
/// `Origin` header (health checks, server-to-server calls) pass through.
pub async fn reject_untrusted_origin(
    State(policy): State<OriginPolicy>,
    req: Request,
    next: Next,
) -> Response {
    if let Some(origin) = req.headers().get(header::ORIGIN) {
        let allowed = origin.to_str().map(|o| policy.allows(o)).unwrap_or(false);
        if !allowed {
            warn!(origin = ?origin, uri = %req.uri(), "origin rejected");
            return ApiError::Forbidden("Not allowed by CORS".into()).into_response();
        }
    }
    next.run(req).await
}
