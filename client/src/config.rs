//! Configuration management for the bar inventory client
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with BARINV_ prefix, e.g.
//!    `BARINV_SESSION__BAR_ID`

use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::{parse_business_date, BarId, DayKey, Role};

use crate::error::{ClientError, ClientResult};

/// Main client configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Backend API configuration
    pub api: ApiConfig,

    /// Which bar-day to open and as whom
    pub session: SessionConfig,

    /// Local persistence of pending edits
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Base URL of the backend, without the `/api` suffix
    pub base_url: String,

    /// Bearer token from the login response
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub bar_id: String,

    /// Business date (YYYY-MM-DD); today when absent
    pub date: Option<String>,

    /// Role from the login payload
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// JSON file holding pending edits and cash counts
    pub path: PathBuf,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("BARINV_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("api.base_url", "http://localhost:5000")?
            .set_default("api.timeout_secs", 30)?
            .set_default("storage.path", ".barinv/store.json")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (BARINV_ prefix)
            .add_source(
                Environment::with_prefix("BARINV")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl SessionConfig {
    /// Resolve the configured session into typed values
    pub fn resolve(&self) -> ClientResult<SessionContext> {
        if self.bar_id.trim().is_empty() {
            return Err(ClientError::Configuration(
                "session.bar_id must be set".to_string(),
            ));
        }
        let today = Utc::now().date_naive();
        let date = match self.date.as_deref() {
            Some(raw) => parse_business_date(raw)
                .map_err(|e| ClientError::InvalidDate(format!("{raw}: {e}")))?,
            None => today,
        };

        Ok(SessionContext {
            day: DayKey::new(BarId::new(self.bar_id.trim()), date),
            today,
            role: Role::resolve(self.role.as_deref()),
        })
    }
}

/// Explicit request context for an inventory session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub day: DayKey,
    pub today: NaiveDate,
    pub role: Option<Role>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(bar_id: &str, date: Option<&str>, role: Option<&str>) -> SessionConfig {
        SessionConfig {
            bar_id: bar_id.to_string(),
            date: date.map(str::to_string),
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn test_resolve_session() {
        let ctx = session("bar-1", Some("2024-01-02"), Some("Employee"))
            .resolve()
            .unwrap();

        assert_eq!(ctx.day.bar_id.as_str(), "bar-1");
        assert_eq!(ctx.day.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(ctx.role, Some(Role::Employee));
    }

    #[test]
    fn test_resolve_defaults_to_today() {
        let ctx = session("bar-1", None, None).resolve().unwrap();
        assert_eq!(ctx.day.date, ctx.today);
        assert_eq!(ctx.role, None);
    }

    #[test]
    fn test_resolve_rejects_bad_input() {
        assert!(matches!(
            session(" ", None, None).resolve(),
            Err(ClientError::Configuration(_))
        ));
        assert!(matches!(
            session("bar-1", Some("yesterday"), None).resolve(),
            Err(ClientError::InvalidDate(_))
        ));
    }
}
