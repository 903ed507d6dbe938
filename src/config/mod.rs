//! Configuration management for roto-link
//!
//! Handles loading, parsing, and hot-reloading of YAML configuration files.
//! Every field has a default, so an empty file is a valid configuration.

pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

use crate::learn::MAX_STEPPED_LABELS;

pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub midi: MidiConfig,
    pub engine: EngineConfig,
    pub host: HostConfig,
}

/// MIDI port configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct MidiConfig {
    /// Case-insensitive substring of the surface input port name
    pub input_port: String,
    pub output_port: String,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            input_port: default_port(),
            output_port: default_port(),
        }
    }
}

/// Engine timing and limits; can be changed while running
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    pub tick_interval_ms: u64,
    pub display_reset_ms: u64,
    pub knob_display_window_ms: u64,
    pub macro_display_window_ms: u64,
    pub repeat_delay_ms: u64,
    pub repeat_interval_ms: u64,
    pub parameter_observe_delay_ms: u64,
    pub macro_update_delay_ms: u64,
    pub send_names_delay_ms: u64,
    pub learn_steps: u32,
    pub max_stepped_labels: usize,
    pub registry_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 30,
            display_reset_ms: 1000,
            knob_display_window_ms: 100,
            macro_display_window_ms: 300,
            repeat_delay_ms: 400,
            repeat_interval_ms: 50,
            parameter_observe_delay_ms: 200,
            macro_update_delay_ms: 100,
            send_names_delay_ms: 20,
            learn_steps: 48,
            max_stepped_labels: MAX_STEPPED_LABELS,
            registry_capacity: 64,
        }
    }
}

impl EngineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn display_reset(&self) -> Duration {
        Duration::from_millis(self.display_reset_ms)
    }

    pub fn knob_display_window(&self) -> Duration {
        Duration::from_millis(self.knob_display_window_ms)
    }

    pub fn macro_display_window(&self) -> Duration {
        Duration::from_millis(self.macro_display_window_ms)
    }

    pub fn repeat_delay(&self) -> Duration {
        Duration::from_millis(self.repeat_delay_ms)
    }

    pub fn repeat_interval(&self) -> Duration {
        Duration::from_millis(self.repeat_interval_ms)
    }

    pub fn parameter_observe_delay(&self) -> Duration {
        Duration::from_millis(self.parameter_observe_delay_ms)
    }

    pub fn macro_update_delay(&self) -> Duration {
        Duration::from_millis(self.macro_update_delay_ms)
    }

    pub fn send_names_delay(&self) -> Duration {
        Duration::from_millis(self.send_names_delay_ms)
    }
}

/// Simulated host used when no host bridge is attached
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct HostConfig {
    pub name: String,
    pub tracks: usize,
    pub effect_tracks: usize,
    /// Device chain of the cursor track
    pub devices: Vec<SimulatedDevice>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            name: "console".to_string(),
            tracks: 16,
            effect_tracks: 4,
            devices: vec![
                SimulatedDevice {
                    name: "Diva".to_string(),
                    plugin: true,
                    parameters: 12,
                },
                SimulatedDevice {
                    name: "EQ+".to_string(),
                    plugin: false,
                    parameters: 8,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SimulatedDevice {
    pub name: String,
    #[serde(default)]
    pub plugin: bool,
    #[serde(default = "default_parameters")]
    pub parameters: usize,
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path))?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.midi.input_port.trim().is_empty() {
            anyhow::bail!("MIDI input_port cannot be empty");
        }
        if self.midi.output_port.trim().is_empty() {
            anyhow::bail!("MIDI output_port cannot be empty");
        }

        self.engine.validate().context("Invalid engine section")?;

        for (index, device) in self.host.devices.iter().enumerate() {
            if device.name.trim().is_empty() {
                anyhow::bail!("Host device {} name cannot be empty", index);
            }
        }

        Ok(())
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        let intervals = [
            ("tick_interval_ms", self.tick_interval_ms),
            ("display_reset_ms", self.display_reset_ms),
            ("knob_display_window_ms", self.knob_display_window_ms),
            ("macro_display_window_ms", self.macro_display_window_ms),
            ("repeat_delay_ms", self.repeat_delay_ms),
            ("repeat_interval_ms", self.repeat_interval_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                anyhow::bail!("{} must be greater than 0", name);
            }
        }
        if self.learn_steps == 0 {
            anyhow::bail!("learn_steps must be greater than 0");
        }
        if self.registry_capacity == 0 {
            anyhow::bail!("registry_capacity must be greater than 0");
        }
        if self.max_stepped_labels > MAX_STEPPED_LABELS {
            anyhow::bail!(
                "max_stepped_labels {} exceeds the surface limit of {}",
                self.max_stepped_labels,
                MAX_STEPPED_LABELS
            );
        }
        Ok(())
    }
}

fn default_port() -> String {
    "Roto-Control".to_string()
}

fn default_parameters() -> usize {
    8
}
