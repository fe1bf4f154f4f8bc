//! Configuration loading and typed config structures.
//!
//! The canonical configuration lives in `liftsim-config.yaml` at the
//! project root. Every field has a serde default, so an empty file (or no
//! file at all) yields a runnable in-memory simulation.

use std::path::Path;

use serde::Deserialize;

/// Smallest accepted scheduler interval, in milliseconds.
pub const MIN_TICK_INTERVAL_MS: u64 = 10;

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

    /// The file parsed but a value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration, mirroring `liftsim-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Scheduler cadence and door timing.
    #[serde(default)]
    pub simulation: SimulationSettings,

    /// Limits enforced when buildings are created.
    #[serde(default)]
    pub buildings: BuildingLimits,

    /// Connection strings and ports.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file.
    ///
    /// Environment variables override infrastructure values:
    /// - `DATABASE_URL` sets `infrastructure.database_url`
    /// - `NATS_URL` sets `infrastructure.nats_url`
    /// - `LIFTSIM_OBSERVER_PORT` sets `infrastructure.observer_port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, and
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.infrastructure.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// No environment overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] or [`ConfigError::Invalid`].
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        if sim.tick_interval_ms < MIN_TICK_INTERVAL_MS {
            return Err(ConfigError::Invalid(format!(
                "simulation.tick_interval_ms must be at least {MIN_TICK_INTERVAL_MS}"
            )));
        }
        if sim.door_open_ticks == 0 {
            return Err(ConfigError::Invalid(
                "simulation.door_open_ticks must be at least 1".to_owned(),
            ));
        }
        if sim.door_close_ticks == 0 {
            return Err(ConfigError::Invalid(
                "simulation.door_close_ticks must be at least 1".to_owned(),
            ));
        }

        let limits = &self.buildings;
        if limits.min_floors == 0 || limits.min_floors > limits.max_floors {
            return Err(ConfigError::Invalid(format!(
                "buildings floor range {}..={} is empty or starts at 0",
                limits.min_floors, limits.max_floors
            )));
        }
        if limits.max_name_length == 0 {
            return Err(ConfigError::Invalid(
                "buildings.max_name_length must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// Door timing extracted from the simulation section.
    pub const fn door_timing(&self) -> DoorTiming {
        DoorTiming {
            open_ticks: self.simulation.door_open_ticks,
            close_ticks: self.simulation.door_close_ticks,
        }
    }
}

/// Scheduler cadence and door timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationSettings {
    /// Real-time milliseconds between scheduler cycles.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Ticks the doors take to open.
    #[serde(default = "default_door_ticks")]
    pub door_open_ticks: u32,

    /// Ticks the doors take to close.
    #[serde(default = "default_door_ticks")]
    pub door_close_ticks: u32,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            door_open_ticks: default_door_ticks(),
            door_close_ticks: default_door_ticks(),
        }
    }
}

/// How many ticks each door phase lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorTiming {
    /// Ticks spent in `OpeningDoors` before the doors are `Open`.
    pub open_ticks: u32,
    /// Ticks spent in `ClosingDoors` before the doors are `Closed`.
    pub close_ticks: u32,
}

impl Default for DoorTiming {
    fn default() -> Self {
        Self {
            open_ticks: default_door_ticks(),
            close_ticks: default_door_ticks(),
        }
    }
}

/// Limits enforced by [`create_building`](crate::calls::create_building).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildingLimits {
    /// Fewest floors a building may have.
    #[serde(default = "default_min_floors")]
    pub min_floors: u32,

    /// Most floors a building may have.
    #[serde(default = "default_max_floors")]
    pub max_floors: u32,

    /// Longest accepted building name, in characters.
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
}

impl Default for BuildingLimits {
    fn default() -> Self {
        Self {
            min_floors: default_min_floors(),
            max_floors: default_max_floors(),
            max_name_length: default_max_name_length(),
        }
    }
}

/// Connection strings and ports.
///
/// A missing `database_url` runs the engine on the in-memory store; a
/// missing `nats_url` disables NATS publishing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// `PostgreSQL` connection string.
    #[serde(default)]
    pub database_url: Option<String>,

    /// NATS server URL.
    #[serde(default)]
    pub nats_url: Option<String>,

    /// Address the observer binds to.
    #[serde(default = "default_observer_host")]
    pub observer_host: String,

    /// Port the observer listens on.
    #[serde(default = "default_observer_port")]
    pub observer_port: u16,
}

impl InfrastructureConfig {
    /// Override values with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DATABASE_URL") {
            self.database_url = Some(val);
        }
        if let Ok(val) = std::env::var("NATS_URL") {
            self.nats_url = Some(val);
        }
        if let Some(port) = std::env::var("LIFTSIM_OBSERVER_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.observer_port = port;
        }
    }
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            nats_url: None,
            observer_host: default_observer_host(),
            observer_port: default_observer_port(),
        }
    }
}

/// Log output settings. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error).
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

const fn default_tick_interval_ms() -> u64 {
    1000
}

const fn default_door_ticks() -> u32 {
    2
}

const fn default_min_floors() -> u32 {
    1
}

const fn default_max_floors() -> u32 {
    100
}

const fn default_max_name_length() -> usize {
    255
}

fn default_observer_host() -> String {
    String::from("0.0.0.0")
}

const fn default_observer_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    String::from("info")
}
