//! Domain service configuration

use std::time::Duration;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Domain service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Environment: development | staging | production
    pub environment: String,
    /// Connection pool size
    pub db_max_connections: u32,
    /// Deadline for one command, `None` when OPERATION_TIMEOUT_MS is 0
    pub operation_timeout: Option<Duration>,
    /// Log filter directive, e.g. `info` or `efish_domain=debug`
    pub log_level: String,
    /// Daily rolling log files go here when set
    pub log_dir: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, BoxError> {
        let database_url = var("DATABASE_URL")
            .filter(|s| !s.is_empty())
            .ok_or("DATABASE_URL must be set")?;

        let db_max_connections = match var("DB_MAX_CONNECTIONS") {
            Some(v) => v
                .parse()
                .map_err(|_| format!("DB_MAX_CONNECTIONS is not a number: {v}"))?,
            None => 10,
        };

        let timeout_ms: u64 = match var("OPERATION_TIMEOUT_MS") {
            Some(v) => v
                .parse()
                .map_err(|_| format!("OPERATION_TIMEOUT_MS is not a number: {v}"))?,
            None => 30_000,
        };

        Ok(Self {
            database_url,
            environment: var("ENVIRONMENT").unwrap_or_else(|| "development".into()),
            db_max_connections,
            operation_timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: var("LOG_DIR").filter(|s| !s.is_empty()),
        })
    }
}
