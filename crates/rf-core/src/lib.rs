//! rf-core: shared types used across the rendering-core workspace.

mod buffer;
mod error;
mod notify;
mod sample;
mod tempo;
mod volume;

pub use buffer::*;
pub use error::*;
pub use notify::*;
pub use sample::*;
pub use tempo::*;
pub use volume::*;

/// Sample rate in Hz. Kept as a plain `u32` (rather than the teacher's
/// closed enum) since the render core places no constraint on which rates
/// are valid — that's a driver/hardware concern, not a mixing-core one.
pub type SampleRateHz = u32;

/// Output channel layout the render core is configured for (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    #[inline]
    pub fn channel_count(self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }
}

/// Identifies an `AudioChannel` (a "voice") within the engine. Shared
/// between `rf-event` (events are indexed per channel) and `rf-engine`
/// (channels are looked up by id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct ChannelId(pub u32);

