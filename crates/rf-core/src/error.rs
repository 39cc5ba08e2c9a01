//! Shared error type for the rendering core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RfError {
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("channel count mismatch: {src} into {dst}")]
    ChannelMismatch { src: usize, dst: usize },

    #[error("buffer underrun")]
    BufferUnderrun,
}

pub type RfResult<T> = Result<T, RfError>;
