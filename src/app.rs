use std::net::SocketAddr;

use axum::{middleware, Router};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::cors::{reject_untrusted_origin, OriginPolicy};
use crate::middleware::{security_headers, stamp_response_time, X_REQUEST_ID};
use crate::state::AppState;
use crate::{auth, health, rpc};

pub fn build_app(state: AppState) -> Router {
    let origins = OriginPolicy::new(&state.config.web_urls);
    let environment = state.config.environment;

    let procedures = Router::new()
        .merge(health::router())
        .merge(auth::router())
        .fallback(rpc::unknown_procedure);

    let mut app = Router::new()
        .merge(health::root_router())
        .nest("/trpc", procedures)
        .with_state(state)
        .layer(origins.layer())
        .layer(middleware::from_fn_with_state(
            origins.clone(),
            reject_untrusted_origin,
        ));

    // Outside the origin guard so rejected requests carry them too.
    for (name, value) in security_headers(environment) {
        app = app.layer(SetResponseHeaderLayer::overriding(name, value));
    }

    // Set runs first, so the trace span and the response both see the id.
    app.layer(middleware::from_fn(stamp_response_time))
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    let request_id = req
                        .headers()
                        .get(&X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-")
                        .to_string();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        %request_id,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
        .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
}

/// Serve until SIGINT/SIGTERM, then drain in-flight requests and close the store.
pub async fn serve(app: Router, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.host, state.config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped; closing user store");
    state.users.close().await;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                tracing::warn!("could not register unix signal handlers; falling back to ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("shutdown signal received");
}
