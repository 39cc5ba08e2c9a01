//! File I/O error types (§7: fallible only at the disk-writer edge, never
//! inside the render path).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("recorder is not active")]
    NotRecording,
}

pub type FileResult<T> = Result<T, FileError>;
