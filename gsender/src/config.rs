/*!
Configuration management for the GCode sender.
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use stepper_link::{SerialConfig, SimulatorSettings, TimingSettings};
use tracing::info;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub timing: TimingSettings,
    pub simulator: SimulatorConfig,
}

impl AppConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            info!("📄 Loading configuration from {}", path.display());
            Self::load_from_file(path)
        } else {
            info!("📄 No config file at {}, using defaults", path.display());
            Ok(Self::new())
        }
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize config to TOML")?;

        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }
}

/// Simulated controller configuration (used with `--simulate`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Time the simulated controller takes to acknowledge a frame
    pub ack_latency_ms: u64,
}

impl SimulatorConfig {
    pub fn settings(&self) -> SimulatorSettings {
        SimulatorSettings {
            ack_latency: Duration::from_millis(self.ack_latency_ms),
            ack_limit: None,
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self { ack_latency_ms: 20 }
    }
}
