#![allow(dead_code)]

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use http_body_util::BodyExt;
use identity_api::{
    app::build_app,
    auth::{memory::MemoryUserStore, repo::UserStore},
    config::{AppConfig, Environment},
    mail::MemoryMailer,
    state::AppState,
};
use tower::ServiceExt;

pub struct TestApp {
    pub app: axum::Router,
    pub users: Arc<MemoryUserStore>,
    pub mailer: Arc<MemoryMailer>,
    pub config: Arc<AppConfig>,
}

/// Router over an in-memory store and a recording mailer.
pub fn test_app() -> TestApp {
    test_app_with(|_| {})
}

/// Like [`test_app`], with the config adjusted before the router is built.
pub fn test_app_with(configure: impl FnOnce(&mut AppConfig)) -> TestApp {
    build(configure, |users| users as Arc<dyn UserStore>)
}

/// Like [`test_app`], with the router talking to `wrap(users)` instead of
/// the memory store directly. `TestApp::users` still exposes the rows.
pub fn test_app_over(
    wrap: impl FnOnce(Arc<MemoryUserStore>) -> Arc<dyn UserStore>,
) -> TestApp {
    build(|_| {}, wrap)
}

fn build(
    configure: impl FnOnce(&mut AppConfig),
    wrap: impl FnOnce(Arc<MemoryUserStore>) -> Arc<dyn UserStore>,
) -> TestApp {
    let mut config = AppConfig::with_defaults("memory://", "test-secret");
    config.environment = Environment::Test;
    config.web_urls = vec!["https://app.example.com".into()];
    configure(&mut config);
    let config = Arc::new(config);

    let users = Arc::new(MemoryUserStore::new());
    let mailer = Arc::new(MemoryMailer::new());
    let state = AppState::from_parts(wrap(users.clone()), mailer.clone(), config.clone());

    TestApp {
        app: build_app(state),
        users,
        mailer,
        config,
    }
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub json: serde_json::Value,
}

pub async fn send(
    app: &axum::Router,
    method: Method,
    uri: &str,
    origin: Option<&str>,
    body: Option<serde_json::Value>,
) -> Reply {
    let mut req = axum::http::Request::builder().method(method).uri(uri);
    if let Some(origin) = origin {
        req = req.header("origin", origin);
    }
    let body = match body {
        Some(json) => {
            req = req.header("content-type", "application/json");
            axum::body::Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => axum::body::Body::empty(),
    };
    let response = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    Reply {
        status,
        headers,
        json,
    }
}

/// POST a procedure call and return (status, parsed JSON body).
pub async fn call(
    app: &axum::Router,
    procedure: &str,
    input: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let reply = send(
        app,
        Method::POST,
        &format!("/trpc/{procedure}"),
        None,
        Some(input),
    )
    .await;
    (reply.status, reply.json)
}

pub async fn get(app: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let reply = send(app, Method::GET, uri, None, None).await;
    (reply.status, reply.json)
}

/// Pulls the `token` query parameter out of a verification link.
pub fn token_from_link(link: &str) -> Option<&str> {
    let (_, query) = link.split_once('?')?;
    query.split('&').find_map(|pair| pair.strip_prefix("token="))
}
