//! Config-file-plus-CLI-flags layering (SPEC_FULL.md §10.3), following the
//! clap-plus-serde pattern the `ampactor-sonido` CLI crate uses for its own
//! `sonido-config` overlay: an optional TOML file supplies defaults, and
//! any flag the user actually passed on the command line wins.

use std::path::Path;

use rf_engine::{EngineConfig, FeatureFlags};
use serde::{Deserialize, Serialize};

/// Mirrors [`EngineConfig`]/[`FeatureFlags`], but every field is optional
/// so a partial TOML file only overrides what it mentions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    pub sample_rate: Option<u32>,
    pub buffer_size: Option<usize>,
    pub output_channels: Option<u16>,
    pub input_channels: Option<u16>,
    pub tempo_bpm: Option<f64>,
    pub beats_per_bar: Option<u32>,
    pub beat_unit: Option<u32>,
    pub steps_per_bar: Option<u32>,

    pub channel_caching: Option<bool>,
    pub record_device_input: Option<bool>,
    pub record_output_to_disk: Option<bool>,
    pub record_input_to_disk: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Applies this file's values onto `config`/`flags`, leaving fields it
    /// doesn't mention untouched (defaults already applied by the caller).
    pub fn apply(&self, config: &mut EngineConfig, flags: &mut FeatureFlags) {
        if let Some(v) = self.sample_rate {
            config.sample_rate = v;
        }
        if let Some(v) = self.buffer_size {
            config.buffer_size = v;
        }
        if let Some(v) = self.output_channels {
            config.output_channels = v;
        }
        if let Some(v) = self.input_channels {
            config.input_channels = v;
        }
        if let Some(v) = self.tempo_bpm {
            config.tempo_bpm = v;
        }
        if let Some(v) = self.beats_per_bar {
            config.beats_per_bar = v;
        }
        if let Some(v) = self.beat_unit {
            config.beat_unit = v;
        }
        if let Some(v) = self.steps_per_bar {
            config.steps_per_bar = v;
        }
        if let Some(v) = self.channel_caching {
            flags.channel_caching = v;
        }
        if let Some(v) = self.record_device_input {
            flags.record_device_input = v;
        }
        if let Some(v) = self.record_output_to_disk {
            flags.record_output_to_disk = v;
        }
        if let Some(v) = self.record_input_to_disk {
            flags.record_input_to_disk = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_only_overrides_mentioned_fields() {
        let file = FileConfig {
            tempo_bpm: Some(90.0),
            ..Default::default()
        };
        let mut config = EngineConfig::default();
        let mut flags = FeatureFlags::default();
        let sample_rate_before = config.sample_rate;

        file.apply(&mut config, &mut flags);

        assert_eq!(config.tempo_bpm, 90.0);
        assert_eq!(config.sample_rate, sample_rate_before);
    }
}
