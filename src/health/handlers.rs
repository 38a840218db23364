use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use time::OffsetDateTime;
use tracing::{instrument, warn};

use super::dto::{CheckOutput, DatabaseStatus, DbOutput, HealthReport, ServiceStatus, Services};
use crate::{
    rpc::{RpcReply, RpcResponse},
    state::AppState,
};

#[instrument(skip(state))]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let (status, code, database, error) = match state.users.ping().await {
        Ok(()) => (
            ServiceStatus::Healthy,
            StatusCode::OK,
            DatabaseStatus::Connected,
            None,
        ),
        Err(e) => {
            warn!(error = %e, "database health check failed");
            (
                ServiceStatus::Unhealthy,
                StatusCode::SERVICE_UNAVAILABLE,
                DatabaseStatus::Disconnected,
                Some(e.to_string()),
            )
        }
    };

    let report = HealthReport {
        status,
        timestamp: OffsetDateTime::now_utc(),
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment,
        services: Services { database },
        error,
    };
    (code, Json(report))
}

pub async fn check() -> RpcReply<CheckOutput> {
    Ok(RpcResponse::json(CheckOutput {
        status: "ok",
        timestamp: OffsetDateTime::now_utc(),
    }))
}

#[instrument(skip(state))]
pub async fn db(State(state): State<AppState>) -> RpcReply<DbOutput> {
    let started = Instant::now();
    let database = match state.users.ping().await {
        Ok(()) => DatabaseStatus::Connected,
        Err(e) => {
            warn!(error = %e, "database ping failed");
            DatabaseStatus::Disconnected
        }
    };
    Ok(RpcResponse::json(DbOutput {
        database,
        latency_ms: started.elapsed().as_millis() as u64,
    }))
}
