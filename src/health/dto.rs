use serde::Serialize;
use time::OffsetDateTime;

use crate::config::Environment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    Connected,
    Disconnected,
}

#[derive(Debug, Serialize)]
pub struct Services {
    pub database: DatabaseStatus,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: ServiceStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub version: &'static str,
    pub environment: Environment,
    pub services: Services,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckOutput {
    pub status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbOutput {
    pub database: DatabaseStatus,
    pub latency_ms: u64,
}
