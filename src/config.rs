use std::{fmt, str::FromStr};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Deployment environment, taken from `APP_ENV` (or `NODE_ENV`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => anyhow::bail!("unknown environment: {other}"),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    /// Trusted web origins. The first entry is used to build links sent by email.
    pub web_urls: Vec<String>,
    pub verification: VerificationConfig,
}

impl AppConfig {
    /// Config with every optional setting at its default.
    pub fn with_defaults(database_url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 10,
            host: "0.0.0.0".into(),
            port: 3001,
            environment: Environment::Development,
            web_urls: vec!["http://localhost:3000".into()],
            verification: VerificationConfig {
                secret: secret.into(),
                issuer: "identity-api".into(),
                audience: "email-verification".into(),
                ttl_minutes: 60 * 24,
            },
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let mut config = Self::with_defaults(database_url, secret);

        if let Some(n) = env_parse::<u32>("DATABASE_MAX_CONNECTIONS")? {
            config.max_connections = n;
        }
        if let Ok(host) = std::env::var("API_HOST") {
            config.host = host;
        }
        if let Some(port) = env_parse::<u16>("API_PORT")? {
            config.port = port;
        }
        let env = environment_var(std::env::var("APP_ENV").ok(), std::env::var("NODE_ENV").ok());
        if let Some(env) = env {
            config.environment = env.parse().context("invalid APP_ENV / NODE_ENV")?;
        }
        if let Ok(raw) = std::env::var("WEB_URL") {
            let urls = parse_web_urls(&raw);
            if !urls.is_empty() {
                config.web_urls = urls;
            }
        }
        if let Ok(issuer) = std::env::var("JWT_ISSUER") {
            config.verification.issuer = issuer;
        }
        if let Ok(audience) = std::env::var("JWT_AUDIENCE") {
            config.verification.audience = audience;
        }
        if let Some(ttl) = env_parse::<i64>("VERIFICATION_TTL_MINUTES")? {
            config.verification.ttl_minutes =
                checked_ttl_minutes(ttl).context("invalid VERIFICATION_TTL_MINUTES")?;
        }
        Ok(config)
    }

    /// Base URL of the web app; verification links point here.
    pub fn primary_web_url(&self) -> &str {
        self.web_urls
            .first()
            .map(String::as_str)
            .unwrap_or("http://localhost:3000")
    }
}

/// Longest accepted verification link lifetime: one year.
pub const MAX_TTL_MINUTES: i64 = 525_600;

pub fn checked_ttl_minutes(minutes: i64) -> anyhow::Result<i64> {
    if !(1..=MAX_TTL_MINUTES).contains(&minutes) {
        anyhow::bail!("{minutes} is outside 1..={MAX_TTL_MINUTES} minutes");
    }
    Ok(minutes)
}

/// `APP_ENV` wins; `NODE_ENV` is read when it is unset or blank.
fn environment_var(app_env: Option<String>, node_env: Option<String>) -> Option<String> {
    app_env
        .filter(|v| !v.trim().is_empty())
        .or_else(|| node_env.filter(|v| !v.trim().is_empty()))
}

fn env_parse<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("invalid value for {key}: {v}")),
        Err(_) => Ok(None),
    }
}

/// Splits a comma separated `WEB_URL` value into normalized origins.
pub fn parse_web_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
