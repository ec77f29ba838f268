//! Configuration management for AnalogKey GW
//!
//! Handles loading, validation, and persistence of the YAML settings
//! file. The fields mirror what the translation core consumes: channel,
//! octave windows, the three send flags, the output port pattern, and
//! optionally a custom key table and sensor timing.

pub mod watcher;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

use crate::engine::{EngineConfig, KeyDef, KeyMap, OctaveWindows, SLOT_COUNT};
use crate::input::PollerTiming;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub octaves: OctaveConfig,
    #[serde(default)]
    pub send: SendConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keymap: Option<Vec<KeyDef>>,
    #[serde(default)]
    pub sensor: SensorConfig,
}

/// MIDI output configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MidiConfig {
    /// Substring pattern selecting the output port; empty = start
    /// disconnected until a device is chosen interactively
    #[serde(default)]
    pub output_port: String,
    /// MIDI channel (0-15)
    #[serde(default)]
    pub channel: u8,
}

/// Positions of the two octave windows
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OctaveConfig {
    #[serde(default)]
    pub low: u8,
    #[serde(default = "default_high_octave")]
    pub high: u8,
}

impl Default for OctaveConfig {
    fn default() -> Self {
        OctaveConfig {
            low: 0,
            high: default_high_octave(),
        }
    }
}

/// Which message classes the gateway emits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SendConfig {
    #[serde(default = "default_true")]
    pub note: bool,
    #[serde(default = "default_true")]
    pub aftertouch: bool,
    #[serde(default = "default_true")]
    pub cc: bool,
}

impl Default for SendConfig {
    fn default() -> Self {
        SendConfig {
            note: true,
            aftertouch: true,
            cc: true,
        }
    }
}

/// Polling loop timing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SensorConfig {
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_cycle_delay_ms")]
    pub cycle_delay_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        SensorConfig {
            poll_timeout_ms: default_poll_timeout_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            cycle_delay_ms: default_cycle_delay_ms(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
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

    /// Reject values the core cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.midi.channel > 15 {
            bail!("midi.channel must be 0-15, got {}", self.midi.channel);
        }
        if self.octaves.low > OctaveWindows::MAX_OCTAVE {
            bail!("octaves.low must be 0-9, got {}", self.octaves.low);
        }
        if self.octaves.high > OctaveWindows::MAX_OCTAVE {
            bail!("octaves.high must be 0-9, got {}", self.octaves.high);
        }
        if let Some(keymap) = &self.keymap {
            if keymap.len() != SLOT_COUNT {
                bail!(
                    "keymap must define exactly {} keys, got {}",
                    SLOT_COUNT,
                    keymap.len()
                );
            }
        }
        Ok(())
    }

    /// The engine's view of these settings
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            channel: self.midi.channel,
            windows: OctaveWindows::new(self.octaves.low, self.octaves.high),
            send_note: self.send.note,
            send_aftertouch: self.send.aftertouch,
            send_cc: self.send.cc,
        }
    }

    /// The key table: custom if configured, otherwise the built-in layout
    pub fn build_keymap(&self) -> Result<KeyMap> {
        match &self.keymap {
            Some(defs) => KeyMap::from_defs(defs.clone()),
            None => Ok(KeyMap::with_default_layout()),
        }
    }

    /// Polling loop timing from the sensor section
    pub fn poller_timing(&self) -> PollerTiming {
        PollerTiming {
            poll_timeout: Duration::from_millis(self.sensor.poll_timeout_ms),
            retry_delay: Duration::from_millis(self.sensor.retry_delay_ms),
            cycle_delay: Duration::from_millis(self.sensor.cycle_delay_ms),
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_high_octave() -> u8 {
    1
}
fn default_poll_timeout_ms() -> u64 {
    50
}
fn default_retry_delay_ms() -> u64 {
    500
}
fn default_cycle_delay_ms() -> u64 {
    2
}
