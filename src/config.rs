//! Configuration for the refresh watcher.
//!
//! Loaded from TOML; every section and field falls back to its default.
//!
//! ```toml
//! [server]
//! base_url = "http://127.0.0.1:42069"
//! anchor_id = "content"
//!
//! [schedule]
//! tick_interval_ms = 60000
//!
//! [position]
//! source = "file"
//! path = "/run/gps/fix.json"
//! ```

use crate::error::{Result, WatchError};
use crate::position::{CachedPositionSource, ConfiguredSource, FilePositionSource, FixedPosition};
use crate::scheduler::TICK_INTERVAL;
use rainwatch_fetch::FetchConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Forecast endpoint settings.
    pub server: FetchConfig,
    /// Tick timing.
    pub schedule: ScheduleConfig,
    /// Where positions come from.
    pub position: PositionConfig,
}

/// Tick timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Spacing between successful ticks.
    pub tick_interval_ms: u64,
    /// Oldest cached position reading a tick will accept.
    pub max_position_age_ms: u64,
    /// How long a position query may take.
    pub position_timeout_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: TICK_INTERVAL.as_millis() as u64,
            max_position_age_ms: 10_000,
            position_timeout_ms: 15_000,
        }
    }
}

impl ScheduleConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn max_position_age(&self) -> Duration {
        Duration::from_millis(self.max_position_age_ms)
    }

    pub fn position_timeout(&self) -> Duration {
        Duration::from_millis(self.position_timeout_ms)
    }
}

/// Kind of position source.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSourceKind {
    /// Fixed coordinates from this config.
    #[default]
    Fixed,
    /// A JSON fix file maintained by another process.
    File,
}

/// Position source settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    pub source: PositionSourceKind,
    /// Used by the `fixed` source.
    pub latitude: f64,
    /// Used by the `fixed` source.
    pub longitude: f64,
    /// Fix file for the `file` source.
    pub path: Option<PathBuf>,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            source: PositionSourceKind::Fixed,
            latitude: 52.363137,
            longitude: 4.889856,
            path: None,
        }
    }
}

impl WatchConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| WatchError::Config(e.to_string()))
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
            toml::to_string_pretty(self).map_err(|e| WatchError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/rainwatch/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("rainwatch").join("config.toml")
        } else if let Some(config) = dirs::config_dir() {
            config.join("rainwatch").join("config.toml")
        } else {
            PathBuf::from("/tmp/rainwatch-config/config.toml")
        }
    }

    /// Check values serde cannot.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Config`] for a zero interval or timeout, a
    /// `file` source without a path, or an invalid server section.
    pub fn validate(&self) -> Result<()> {
        self.server
            .validate()
            .map_err(|e| WatchError::Config(e.to_string()))?;

        if self.schedule.tick_interval_ms == 0 {
            return Err(WatchError::Config(
                "schedule.tick_interval_ms must be greater than zero".into(),
            ));
        }
        if self.schedule.position_timeout_ms == 0 {
            return Err(WatchError::Config(
                "schedule.position_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.position.source == PositionSourceKind::File && self.position.path.is_none() {
            return Err(WatchError::Config(
                "position.path is required when position.source = \"file\"".into(),
            ));
        }
        Ok(())
    }

    /// Build the configured position source behind a reading cache.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Config`] if the `file` source has no path.
    pub fn position_source(&self) -> Result<CachedPositionSource<ConfiguredSource>> {
        let source = match self.position.source {
            PositionSourceKind::Fixed => ConfiguredSource::Fixed(FixedPosition::new(
                self.position.latitude,
                self.position.longitude,
            )),
            PositionSourceKind::File => {
                let path = self.position.path.clone().ok_or_else(|| {
                    WatchError::Config("position.path is required for the file source".into())
                })?;
                ConfiguredSource::File(FilePositionSource::new(
                    path,
                    self.schedule.position_timeout(),
                ))
            }
        };
        Ok(CachedPositionSource::new(source))
    }
}
