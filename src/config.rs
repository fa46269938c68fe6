//! Runtime configuration.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `SPRINTLINE_*` environment variables, then command-line flags.
//!
//! ```toml
//! database = "sprintline.db"
//! port = 3000
//! cors_origin = "http://localhost:5173"
//! user_service_url = "http://users.internal:8080"
//! user_lookup_timeout_ms = 3000
//! daily_metrics_interval_secs = 86400
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

const ENV_PREFIX: &str = "SPRINTLINE_";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file path or full database URL
    pub database: String,
    pub port: u16,
    /// Allowed CORS origin; any origin when unset
    pub cors_origin: Option<String>,
    /// Base URL of the user directory; every user is accepted when unset
    pub user_service_url: Option<String>,
    pub user_lookup_timeout_ms: u64,
    pub daily_metrics_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: "sprintline.db".to_string(),
            port: 3000,
            cors_origin: None,
            user_service_url: None,
            user_lookup_timeout_ms: 3000,
            daily_metrics_interval_secs: 86_400,
        }
    }
}

impl AppConfig {
    /// Defaults, overlaid with `path` when given, then with the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Applies `SPRINTLINE_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(database) = var("DATABASE") {
            self.database = database;
        }
        if let Some(port) = var("PORT") {
            self.port = port
                .parse()
                .with_context(|| format!("Invalid {}PORT: {}", ENV_PREFIX, port))?;
        }
        if let Some(origin) = var("CORS_ORIGIN") {
            self.cors_origin = Some(origin);
        }
        if let Some(url) = var("USER_SERVICE_URL") {
            self.user_service_url = Some(url);
        }
        if let Some(timeout) = var("USER_LOOKUP_TIMEOUT_MS") {
            self.user_lookup_timeout_ms = timeout.parse().with_context(|| {
                format!("Invalid {}USER_LOOKUP_TIMEOUT_MS: {}", ENV_PREFIX, timeout)
            })?;
        }
        if let Some(interval) = var("DAILY_METRICS_INTERVAL_SECS") {
            self.daily_metrics_interval_secs = interval.parse().with_context(|| {
                format!("Invalid {}DAILY_METRICS_INTERVAL_SECS: {}", ENV_PREFIX, interval)
            })?;
        }
        Ok(())
    }

    pub fn user_lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.user_lookup_timeout_ms)
    }

    pub fn daily_metrics_interval(&self) -> Duration {
        Duration::from_secs(self.daily_metrics_interval_secs.max(1))
    }
}
