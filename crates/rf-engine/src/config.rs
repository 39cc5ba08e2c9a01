//! Engine-wide configuration and feature flags (SPEC_FULL.md §10.3).
//! Grounded on `rf-audio/src/config.rs`'s `AudioConfig` shape, serialized
//! with `serde` the same way the teacher's config types are so `rf-cli` can
//! load a TOML/JSON file into it.

use rf_core::SampleRateHz;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub sample_rate: SampleRateHz,
    pub buffer_size: usize,
    pub output_channels: u16,
    pub input_channels: u16,
    pub tempo_bpm: f64,
    pub beats_per_bar: u32,
    pub beat_unit: u32,
    pub steps_per_bar: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            buffer_size: 1024,
            output_channels: 2,
            input_channels: 0,
            tempo_bpm: 120.0,
            beats_per_bar: 4,
            beat_unit: 4,
            steps_per_bar: 16,
        }
    }
}

/// Which optional render-path behaviors are active (§6, §11). All default
/// off except `channel_caching`, matching the teacher's "safe by default,
/// opt into the expensive stuff" posture for its own mixer feature flags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub channel_caching: bool,
    pub record_device_input: bool,
    pub record_output_to_disk: bool,
    pub record_input_to_disk: bool,
    pub bouncing: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            channel_caching: true,
            record_device_input: false,
            record_output_to_disk: false,
            record_input_to_disk: false,
            bouncing: false,
        }
    }
}
