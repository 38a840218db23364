use crate::{rpc::unsupported_method, state::AppState};
use axum::{routing::get, Router};

pub mod dto;
pub mod handlers;

/// Plain `/health` check for load balancers.
pub fn root_router() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

/// `health.*` procedures.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/health.check",
            get(handlers::check)
                .post(handlers::check)
                .fallback(unsupported_method),
        )
        .route(
            "/health.db",
            get(handlers::db).post(handlers::db).fallback(unsupported_method),
        )
}
