//! Configuration loading and typed config structures for the colony.
//!
//! The canonical configuration lives in `colony-config.yaml` at the project
//! root. Each subsystem owns the struct for its own section; this module
//! assembles them into [`ColonyConfig`] and adds the sections only the
//! engine binary reads (`logging`, `scenario`). Every section is optional
//! and falls back to its documented defaults.

use std::path::Path;

use serde::Deserialize;

use colony_logistics::LogisticsConfig;
use colony_tasks::ResolverLimits;
use colony_world::MovementConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level colony configuration.
///
/// Mirrors the structure of `colony-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ColonyConfig {
    /// Routing and matching tunables.
    #[serde(default)]
    pub logistics: LogisticsConfig,

    /// Movement primitive tunables.
    #[serde(default)]
    pub movement: MovementConfig,

    /// Task tree resolver bounds.
    #[serde(default)]
    pub resolver: ResolverLimits,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Demo scenario settings, read by the engine binary only.
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

impl ColonyConfig {
    /// Load configuration from a YAML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML or does not
    /// match the expected schema.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yml::from_str(&contents)?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }
}

/// Log output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Demo scenario configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScenarioConfig {
    /// Number of ticks to simulate.
    #[serde(default = "default_ticks")]
    pub ticks: u64,

    /// Seed for scenario placement.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Number of carrier units.
    #[serde(default = "default_haulers")]
    pub haulers: u32,

    /// Carry capacity of each carrier.
    #[serde(default = "default_hauler_capacity")]
    pub hauler_capacity: u32,

    /// Number of harvesting units.
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Number of dropped energy piles scattered at start.
    #[serde(default = "default_dropped_piles")]
    pub dropped_piles: u32,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            ticks: default_ticks(),
            seed: default_seed(),
            haulers: default_haulers(),
            hauler_capacity: default_hauler_capacity(),
            workers: default_workers(),
            dropped_piles: default_dropped_piles(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_ticks() -> u64 {
    300
}

const fn default_seed() -> u64 {
    42
}

const fn default_haulers() -> u32 {
    3
}

const fn default_hauler_capacity() -> u32 {
    100
}

const fn default_workers() -> u32 {
    2
}

const fn default_dropped_piles() -> u32 {
    4
}
