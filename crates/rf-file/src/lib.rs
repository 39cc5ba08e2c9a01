//! rf-file: the disk recorder (§4.9). Encodes only — WAV via `hound` — per
//! the core's Non-goal that decoding/DSP stays out of this crate.

mod error;
mod recorder;

pub use error::*;
pub use recorder::*;
