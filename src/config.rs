//! Configuration management for the flood control gate.

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{FloodControlError, Result};

/// Prefix for environment variable overrides, e.g. `FLOOD_CONTROL__GATE__MAX_CHECKS`.
pub const ENV_PREFIX: &str = "FLOOD_CONTROL";

/// Main configuration for the flood control process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FloodControlConfig {
    /// Gate limits
    #[serde(default)]
    pub gate: GateConfig,

    /// Idle identifier reaping
    #[serde(default)]
    pub reaper: ReaperConfig,

    /// Demonstration driver settings
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Limits applied by a [`RateGate`](crate::gate::RateGate).
///
/// Fixed at construction; every identifier shares the same limits. The
/// window is read from and written to `window_ms` in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Trailing window
    #[serde(rename = "window_ms", with = "millis", default = "default_window")]
    pub window: Duration,

    /// Maximum checks admitted within the window
    #[serde(default = "default_max_checks")]
    pub max_checks: usize,
}

impl GateConfig {
    /// Create a gate configuration from a window and a ceiling.
    pub fn new(window: Duration, max_checks: usize) -> Self {
        Self { window, max_checks }
    }

    /// The trailing window as a duration.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Reject limits the gate cannot enforce.
    pub fn validate(&self) -> Result<()> {
        if self.window.is_zero() {
            return Err(FloodControlError::Config(
                "gate.window_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            max_checks: default_max_checks(),
        }
    }
}

fn default_window() -> Duration {
    Duration::from_secs(10)
}

/// Serde adapter storing a `Duration` as whole milliseconds.
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().min(u64::MAX as u128) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

fn default_max_checks() -> usize {
    5
}

/// Background removal of identifiers that have gone quiet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaperConfig {
    /// Whether the driver spawns the reaper task
    #[serde(default)]
    pub enabled: bool,

    /// How often the reaper runs, in milliseconds
    #[serde(default = "default_reap_interval")]
    pub interval_ms: u64,

    /// Idle time after which an identifier is dropped, in milliseconds
    #[serde(default = "default_idle_after")]
    pub idle_after_ms: u64,
}

impl ReaperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn idle_after(&self) -> Duration {
        Duration::from_millis(self.idle_after_ms)
    }
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: default_reap_interval(),
            idle_after_ms: default_idle_after(),
        }
    }
}

fn default_reap_interval() -> u64 {
    60_000
}

fn default_idle_after() -> u64 {
    300_000
}

/// Settings for the example driver loop in the binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Identifier the driver checks
    #[serde(default = "default_user_id")]
    pub user_id: i64,

    /// Number of checks to issue
    #[serde(default = "default_requests")]
    pub requests: u32,

    /// Pause between checks in milliseconds
    #[serde(default = "default_spacing")]
    pub spacing_ms: u64,
}

impl DemoConfig {
    pub fn spacing(&self) -> Duration {
        Duration::from_millis(self.spacing_ms)
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            requests: default_requests(),
            spacing_ms: default_spacing(),
        }
    }
}

fn default_user_id() -> i64 {
    123
}

fn default_requests() -> u32 {
    6
}

fn default_spacing() -> u64 {
    1_000
}

impl FloodControlConfig {
    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: FloodControlConfig = serde_yaml::from_str(yaml)
            .map_err(|e| FloodControlError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading flood control configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from an optional YAML file, overridden by
    /// `FLOOD_CONTROL__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    pub(crate) fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading flood control configuration");
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml));
        }

        let config: FloodControlConfig = builder
            .add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the gate cannot work with.
    pub fn validate(&self) -> Result<()> {
        self.gate.validate()?;
        if self.reaper.enabled && self.reaper.interval_ms == 0 {
            return Err(FloodControlError::Config(
                "reaper.interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
