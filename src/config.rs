//! Startup configuration from the environment

use crate::llm::LlmConfig;
use chrono::FixedOffset;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
/// Colombia, no daylight saving
const DEFAULT_UTC_OFFSET_HOURS: i32 = -5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
    /// Offset used to bucket boardings by local hour
    pub utc_offset: FixedOffset,
    /// Replaces the built-in catalog when set
    pub catalog_path: Option<PathBuf>,
    pub llm: LlmConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let db_path = var("FLEET_DB_PATH").map_or_else(
            || {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.fleet-tally/sessions.db"))
            },
            PathBuf::from,
        );

        let port = match var("FLEET_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "FLEET_PORT",
                expected: "a port number",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let offset_hours = match var("FLEET_UTC_OFFSET_HOURS") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "FLEET_UTC_OFFSET_HOURS",
                expected: "a whole number of hours",
                value: raw.clone(),
            })?,
            None => DEFAULT_UTC_OFFSET_HOURS,
        };
        let utc_offset = offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ConfigError::Invalid {
                name: "FLEET_UTC_OFFSET_HOURS",
                expected: "between -23 and 23",
                value: offset_hours.to_string(),
            })?;

        Ok(Self {
            db_path,
            port,
            utc_offset,
            catalog_path: var("FLEET_CATALOG_PATH").map(PathBuf::from),
            llm: LlmConfig::from_lookup(var),
        })
    }
}
