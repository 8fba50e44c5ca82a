//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/surveylens/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/surveylens/` (~/.config/surveylens/)
//! - Data: `$XDG_DATA_HOME/surveylens/` (~/.local/share/surveylens/)
//! - State/Logs: `$XDG_STATE_HOME/surveylens/` (~/.local/state/surveylens/)

use crate::analytics::{
    AggregationUnit, CalendarZone, DashboardControls, WeekStart, WindowKind,
};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Largest accepted UTC offset, in minutes (UTC-18:00 ..= UTC+18:00).
const MAX_UTC_OFFSET_MINUTES: i32 = 18 * 60;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Dashboard defaults and calendar rules
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Survey-result source configuration
    #[serde(default)]
    pub source: SourceConfig,
}

/// Dashboard defaults and calendar conventions
#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    /// Window selected when the dashboard opens
    #[serde(default = "default_window")]
    pub default_window: WindowKind,

    /// Time-series granularity selected when the dashboard opens
    #[serde(default = "default_aggregation_unit")]
    pub aggregation_unit: AggregationUnit,

    /// First day of a week bucket
    #[serde(default)]
    pub week_start: WeekStart,

    /// Fixed offset from UTC used for every calendar computation
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Display text for an absent comment or star
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_window: default_window(),
            aggregation_unit: default_aggregation_unit(),
            week_start: WeekStart::default(),
            utc_offset_minutes: 0,
            placeholder: default_placeholder(),
        }
    }
}

fn default_window() -> WindowKind {
    WindowKind::LastMonth
}

fn default_aggregation_unit() -> AggregationUnit {
    AggregationUnit::Day
}

fn default_placeholder() -> String {
    "---".to_string()
}

impl DashboardConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(Error::Config(format!(
                "dashboard.utc_offset_minutes must be between -{max} and {max}",
                max = MAX_UTC_OFFSET_MINUTES
            )));
        }
        if self.placeholder.is_empty() {
            return Err(Error::Config(
                "dashboard.placeholder must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Calendar zone used for day, week and month arithmetic.
    pub fn zone(&self) -> Result<CalendarZone> {
        self.validate()?;
        CalendarZone::from_offset_minutes(self.utc_offset_minutes, self.week_start).ok_or_else(
            || {
                Error::Config(format!(
                    "invalid utc offset: {} minutes",
                    self.utc_offset_minutes
                ))
            },
        )
    }

    /// Controls the dashboard starts with: the configured window and unit,
    /// newest feedback first, no column filters.
    pub fn default_controls(&self) -> DashboardControls {
        DashboardControls {
            window: self.default_window,
            aggregation_unit: self.aggregation_unit,
            ..DashboardControls::default()
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// Survey-result source configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct SourceConfig {
    /// Override for the directory holding `<company>/<shop>.json` files
    pub data_dir: Option<PathBuf>,
}

impl SourceConfig {
    /// Directory the JSON source reads from.
    pub fn results_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| Config::data_dir().join("results"))
    }
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.dashboard.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/surveylens/config.toml` (~/.config/surveylens/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("surveylens").join("config.toml")
    }

    /// Returns the data directory path
    ///
    /// `$XDG_DATA_HOME/surveylens/` (~/.local/share/surveylens/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("surveylens")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/surveylens/` (~/.local/state/surveylens/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("surveylens")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/surveylens/surveylens.log` (~/.local/state/surveylens/surveylens.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("surveylens.log")
    }
}
