//! Engine-level error type: wraps the three crates `Engine` can fail
//! through (mixing, driver, disk) behind one `thiserror` enum, the same
//! `#[from]`-composition style `rf-file::FileError` uses.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Mixing(#[from] rf_core::RfError),

    #[error(transparent)]
    Driver(#[from] rf_audio::AudioError),

    #[error(transparent)]
    File(#[from] rf_file::FileError),

    #[error("channel {0:?} not found")]
    UnknownChannel(rf_core::ChannelId),
}

pub type EngineResult<T> = Result<T, EngineError>;
