//! Configuration loading using Figment
//!
//! Configuration is layered from:
//! 1. Built-in defaults (9600 baud, 5 s read timeout, cp437, 300 ms refresh)
//! 2. `config/monitor.toml` or a file given on the command line (optional)
//! 3. Environment variables prefixed with `WEIGH_MONITOR_`, nested keys
//!    separated by `__`
//!
//! # Example
//! ```no_run
//! use weigh_monitor::config::MonitorConfig;
//!
//! let config = MonitorConfig::load()?;
//! println!("Baud rate: {}", config.serial.baud_rate);
//! # Ok::<(), weigh_monitor::error::MonitorError>(())
//! ```

use crate::adapters::{SerialSettings, DEFAULT_BAUD_RATE};
use crate::encoding::TextEncoding;
use crate::error::{AppResult, MonitorError};
use crate::session::DEFAULT_CHANNEL_CAPACITY;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/monitor.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "WEIGH_MONITOR_";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MonitorConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Serial transport settings
    #[serde(default)]
    pub serial: SerialConfig,
    /// Display refresh settings
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Window title and log label
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Serial transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Baud rate of the instrument
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Maximum time a single line read may block, in milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Text encoding on the wire
    #[serde(default)]
    pub encoding: TextEncoding,
}

/// Display configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// How often the plot pulls new samples, in milliseconds
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    /// Samples buffered between refreshes before the oldest are dropped
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

// Default value functions
fn default_name() -> String {
    "Weigh monitor".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_read_timeout_ms() -> u64 {
    5000
}

fn default_refresh_interval_ms() -> u64 {
    300
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            encoding: TextEncoding::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from `config/monitor.toml` and environment variables
    ///
    /// A missing file is not an error; defaults apply.
    /// Example override: `WEIGH_MONITOR_SERIAL__BAUD_RATE=115200`
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config: Self = Figment::from(Serialized::defaults(MonitorConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(MonitorError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.serial.baud_rate == 0 {
            return Err(MonitorError::Configuration(
                "baud_rate must be greater than 0".to_string(),
            ));
        }

        if self.serial.read_timeout_ms == 0 {
            return Err(MonitorError::Configuration(
                "read_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.display.refresh_interval_ms == 0 {
            return Err(MonitorError::Configuration(
                "refresh_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.display.channel_capacity == 0 {
            return Err(MonitorError::Configuration(
                "channel_capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Transport settings for opening the port
    pub fn serial_settings(&self) -> SerialSettings {
        SerialSettings {
            baud_rate: self.serial.baud_rate,
            read_timeout: Duration::from_millis(self.serial.read_timeout_ms),
            encoding: self.serial.encoding,
        }
    }

    /// Display refresh interval
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.display.refresh_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_instrument() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());

        let settings = config.serial_settings();
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.read_timeout, Duration::from_secs(5));
        assert_eq!(settings.encoding, TextEncoding::Cp437);
        assert_eq!(config.refresh_interval(), Duration::from_millis(300));
    }

    #[test]
    fn test_config_validation() {
        let mut config = MonitorConfig::default();
        config.application.log_level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.serial.read_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.display.channel_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.application.log_level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
    }
}
