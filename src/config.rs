//! Global configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Timelike;
use serde::Deserialize;

use crate::models::time::parse_clock;
use crate::{AppError, Result};

/// Default work window and gap threshold used for free-slot queries.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ScheduleConfig {
    /// Start of the daily work window (`HH:MM`).
    #[serde(default = "default_work_start")]
    pub work_start: String,
    /// End of the daily work window (`HH:MM`).
    #[serde(default = "default_work_end")]
    pub work_end: String,
    /// Shortest gap reported as a free slot.
    #[serde(default = "default_min_gap_minutes")]
    pub min_gap_minutes: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            work_start: default_work_start(),
            work_end: default_work_end(),
            min_gap_minutes: default_min_gap_minutes(),
        }
    }
}

/// Calendar feed fetching settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CalendarConfig {
    /// Upper bound on a single source fetch.
    #[serde(default = "default_fetch_timeout_seconds")]
    pub fetch_timeout_seconds: u64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_seconds: default_fetch_timeout_seconds(),
        }
    }
}

fn default_work_start() -> String {
    "08:00".into()
}

fn default_work_end() -> String {
    "22:00".into()
}

fn default_min_gap_minutes() -> u32 {
    30
}

fn default_fetch_timeout_seconds() -> u64 {
    10
}

fn default_db_path() -> PathBuf {
    PathBuf::from("smart-planner.db")
}

fn default_http_host() -> String {
    "127.0.0.1".into()
}

fn default_http_port() -> u16 {
    8000
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Path of the `SQLite` database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Interface the HTTP API binds to.
    #[serde(default = "default_http_host")]
    pub http_host: String,
    /// Port the HTTP API binds to.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Work window defaults.
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Calendar fetch settings.
    #[serde(default)]
    pub calendar: CalendarConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            http_host: default_http_host(),
            http_port: default_http_port(),
            schedule: ScheduleConfig::default(),
            calendar: CalendarConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Per-source calendar fetch timeout.
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.calendar.fetch_timeout_seconds)
    }

    /// Socket address string for the HTTP listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    fn validate(&self) -> Result<()> {
        let start = parse_clock(&self.schedule.work_start)
            .map_err(|err| AppError::Config(format!("schedule.work_start: {err}")))?;
        let end = parse_clock(&self.schedule.work_end)
            .map_err(|err| AppError::Config(format!("schedule.work_end: {err}")))?;
        if start.hour() >= end.hour() {
            return Err(AppError::Config(
                "schedule.work_start must be earlier than schedule.work_end".into(),
            ));
        }

        if self.schedule.min_gap_minutes == 0 {
            return Err(AppError::Config(
                "schedule.min_gap_minutes must be greater than zero".into(),
            ));
        }

        if self.calendar.fetch_timeout_seconds == 0 {
            return Err(AppError::Config(
                "calendar.fetch_timeout_seconds must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
