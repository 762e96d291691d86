//! Configuration for a poll.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

use emondmon_common::LoggingConfig;

use crate::catalog::{GRAPH_MAX, GRAPH_MIN, GraphId};
use crate::error::PollerError;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] emondmon_common::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Connection settings for one meter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Host address (IP or hostname)
    pub host: String,

    /// TCP port (default: 502)
    #[serde(default = "default_modbus_port")]
    pub port: u16,

    /// Modbus unit/slave ID (1-247)
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,

    /// Connect and per-read timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

pub fn default_modbus_port() -> u16 {
    502
}

pub fn default_unit_id() -> u8 {
    1
}

pub fn default_timeout_ms() -> u64 {
    3000
}

impl DeviceConfig {
    /// Settings for `host` with the default port, unit id and timeout.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_modbus_port(),
            unit_id: default_unit_id(),
            timeout_ms: default_timeout_ms(),
        }
    }

    /// Validate the device settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Device host cannot be empty".to_string(),
            ));
        }

        if !(1..=247).contains(&self.unit_id) {
            return Err(ConfigError::Validation(format!(
                "Device '{}': unit_id must be 1-247, got {}",
                self.host, self.unit_id
            )));
        }

        if self.timeout_ms == 0 {
            return Err(ConfigError::Validation(format!(
                "Device '{}': timeout_ms must be greater than zero",
                self.host
            )));
        }

        Ok(())
    }
}

/// What to read from the meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "graph", rename_all = "lowercase")]
pub enum Selection {
    /// Every register in the catalog.
    All,
    /// The measurements of one instrument panel.
    Graph(GraphId),
}

impl Selection {
    /// Build a selection from the "all" flag and an optional graph number.
    ///
    /// Exactly one of the two must be given, and the graph must be in 1..=10.
    pub fn from_flags(all: bool, graph: Option<i64>) -> Result<Self, PollerError> {
        match (all, graph) {
            (true, None) => Ok(Selection::All),
            (false, Some(n)) => {
                let id = u8::try_from(n).map_err(|_| {
                    PollerError::invalid_selection(format!(
                        "graph must be between {} and {}, got {}",
                        GRAPH_MIN, GRAPH_MAX, n
                    ))
                })?;
                Ok(Selection::Graph(GraphId::new(id)?))
            }
            (true, Some(_)) => Err(PollerError::invalid_selection(
                "'all' and 'graph' are mutually exclusive",
            )),
            (false, None) => Err(PollerError::invalid_selection(
                "one of 'all' or 'graph' is required",
            )),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => write!(f, "all"),
            Selection::Graph(id) => write!(f, "graph {}", id),
        }
    }
}

/// Everything one poll needs, built once by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub device: DeviceConfig,
    pub selection: Selection,
}

impl PollConfig {
    pub fn new(device: DeviceConfig, selection: Selection) -> Self {
        Self { device, selection }
    }
}

/// Optional per-site settings file.
///
/// ```json5
/// {
///     device: { port: 502, unit_id: 1, timeout_ms: 3000 },
///     logging: { level: "info", format: "text" },
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    /// Device defaults (the host always comes from the command line)
    #[serde(default)]
    pub device: DeviceDefaults,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Device settings that may be preset in the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDefaults {
    #[serde(default = "default_modbus_port")]
    pub port: u16,
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for DeviceDefaults {
    fn default() -> Self {
        Self {
            port: default_modbus_port(),
            unit_id: default_unit_id(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl DeviceDefaults {
    /// Device settings for `host` using these defaults.
    pub fn for_host(&self, host: impl Into<String>) -> DeviceConfig {
        DeviceConfig {
            host: host.into(),
            port: self.port,
            unit_id: self.unit_id,
            timeout_ms: self.timeout_ms,
        }
    }
}

impl SettingsFile {
    /// Load settings from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings: SettingsFile = emondmon_common::load_config(path)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // The host is a placeholder; only the defaults are checked here.
        self.device.for_host("settings").validate()
    }
}
