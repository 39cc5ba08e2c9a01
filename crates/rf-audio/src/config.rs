//! Audio configuration surface (§10.3): the fields a host or the CLI demo
//! sets before a [`crate::DriverAdapter`] is created. Kept as plain integers
//! rather than the teacher's closed `BufferSize`/`SampleRate` enums — the
//! render core places no constraint on which values are legal, that's a
//! device/driver concern surfaced as `AudioError::Unsupported*` at creation
//! time instead of a type-level one.

use rf_core::SampleRateHz;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: SampleRateHz,
    pub buffer_size: usize,
    pub output_channels: u16,
    pub input_channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            buffer_size: 1_024,
            output_channels: 2,
            input_channels: 0,
        }
    }
}
