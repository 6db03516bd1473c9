//! Service configuration, read from the environment at startup.

use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(format!("expected json or pretty, got {other}")),
        }
    }
}

/// Settings for the orchestrator service.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    pub host: String,
    pub port: u16,
    /// PostgreSQL session store. Sessions are kept in memory when unset.
    pub database_url: Option<String>,
    /// Stamped on relayed events; events carrying it are ignored on receipt.
    pub service_name: String,
    pub bus_capacity: usize,
    /// How often controllers are expected to report. Only checked against
    /// `controller_timeout` at startup; the sweep reads `controller_timeout`
    /// and `check_interval`.
    pub heartbeat_interval: Duration,
    /// Silence after which an online controller is marked offline.
    pub controller_timeout: chrono::Duration,
    /// Period of the staleness sweep.
    pub check_interval: Duration,
    /// JSON file of puzzle definitions.
    pub puzzle_catalog_path: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 3000,
            database_url: None,
            service_name: "orchestrator-service".to_owned(),
            bus_capacity: 1024,
            heartbeat_interval: Duration::from_millis(30_000),
            controller_timeout: chrono::Duration::milliseconds(90_000),
            check_interval: Duration::from_millis(30_000),
            puzzle_catalog_path: None,
            log_format: LogFormat::Json,
        }
    }
}

impl OrchestratorConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is malformed or the settings
    /// are inconsistent.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, falling back to defaults for
    /// unset variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is malformed or the settings
    /// are inconsistent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let heartbeat_ms = parse(&lookup, "CONTROLLER_HEARTBEAT_INTERVAL_MS", 30_000_u64)?;
        let timeout_ms = parse(&lookup, "CONTROLLER_TIMEOUT_MS", 90_000_u32)?;
        let check_ms = parse(&lookup, "CONTROLLER_CHECK_INTERVAL_MS", 30_000_u64)?;

        let config = Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: parse(&lookup, "PORT", defaults.port)?,
            database_url: non_empty("DATABASE_URL"),
            service_name: non_empty("ORCHESTRATOR_SERVICE_NAME").unwrap_or(defaults.service_name),
            bus_capacity: parse(&lookup, "ORCHESTRATOR_BUS_CAPACITY", defaults.bus_capacity)?,
            heartbeat_interval: Duration::from_millis(heartbeat_ms),
            controller_timeout: chrono::Duration::milliseconds(i64::from(timeout_ms)),
            check_interval: Duration::from_millis(check_ms),
            puzzle_catalog_path: non_empty("PUZZLE_CATALOG_PATH").map(PathBuf::from),
            log_format: parse(&lookup, "LOG_FORMAT", defaults.log_format)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.bus_capacity == 0 {
            return Err(AppError::Config(
                "ORCHESTRATOR_BUS_CAPACITY must be greater than zero".into(),
            ));
        }
        if self.check_interval.is_zero() {
            return Err(AppError::Config(
                "CONTROLLER_CHECK_INTERVAL_MS must be greater than zero".into(),
            ));
        }
        let heartbeat = chrono::Duration::from_std(self.heartbeat_interval)
            .map_err(|e| AppError::Config(format!("CONTROLLER_HEARTBEAT_INTERVAL_MS out of range: {e}")))?;
        if self.controller_timeout < heartbeat {
            return Err(AppError::Config(format!(
                "CONTROLLER_TIMEOUT_MS ({} ms) must not be shorter than CONTROLLER_HEARTBEAT_INTERVAL_MS ({} ms)",
                self.controller_timeout.num_milliseconds(),
                heartbeat.num_milliseconds()
            )));
        }
        Ok(())
    }

    /// The address the HTTP server binds to.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid: {e}"))),
        _ => Ok(default),
    }
}
