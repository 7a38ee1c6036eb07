//! Configuration types for the tracklog poller.

use crate::error::{PollError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TracklogConfig {
    /// Record store settings.
    pub store: StoreConfig,
    /// Remote source settings.
    pub fetcher: FetcherConfig,
    /// Polling cadence settings.
    pub scheduler: SchedulerConfig,
    /// Startup reachability check settings.
    pub connectivity: ConnectivityConfig,
}

/// Record store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file. Parent directories are created on initialize.
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: crate::tracklog_dirs::db_file(),
        }
    }
}

/// Remote source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Endpoint polled with a single `GET` per tick.
    pub endpoint: String,
    /// JSON field mapped to `primary_label`.
    pub primary_field: String,
    /// JSON field mapped to `secondary_label` (the dedup key).
    pub secondary_field: String,
    /// Whole-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://swapi.dev/api/people/1/".to_owned(),
            primary_field: "name".to_owned(),
            secondary_field: "gender".to_owned(),
            timeout_ms: 5_000,
        }
    }
}

impl FetcherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Polling cadence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Fixed tick period in milliseconds, measured from tick start.
    pub interval_ms: u64,
    /// Number of recent tick reports kept in memory.
    pub history_limit: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            history_limit: 100,
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Connectivity check configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// TCP connect timeout for the reachability probe, in milliseconds.
    pub probe_timeout_ms: u64,
    /// Poll period for [`ConnectivityMonitor::watch`](crate::connectivity::ConnectivityMonitor::watch).
    /// `0` disables watching after the startup check.
    pub watch_interval_ms: u64,
    /// Text of the one-shot offline notification.
    pub offline_message: String,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 2_000,
            watch_interval_ms: 0,
            offline_message: "Running in offline mode".to_owned(),
        }
    }
}

impl ConnectivityConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl TracklogConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails [`validate`](Self::validate).
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| PollError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PollError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the poll loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.interval_ms == 0 {
            return Err(PollError::Config("scheduler.interval_ms must be > 0".into()));
        }
        if self.fetcher.timeout_ms == 0 {
            return Err(PollError::Config("fetcher.timeout_ms must be > 0".into()));
        }
        if self.fetcher.primary_field.is_empty() || self.fetcher.secondary_field.is_empty() {
            return Err(PollError::Config("fetcher field names must not be empty".into()));
        }
        url::Url::parse(&self.fetcher.endpoint)
            .map_err(|e| PollError::Config(format!("invalid fetcher.endpoint: {e}")))?;
        Ok(())
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> PathBuf {
        crate::tracklog_dirs::config_file()
    }

    /// Returns the default record database path.
    pub fn default_db_path() -> PathBuf {
        crate::tracklog_dirs::db_file()
    }
}
