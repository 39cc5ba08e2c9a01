//! `DiskRecorder` (§4.9): accumulates rendered (or captured-input) frames
//! into in-memory snippets, flushes each full snippet to a temporary raw
//! file, and concatenates the snippets into a finished WAV on finalize.
//!
//! Grounded on the teacher's `rf-file::recording::DiskWriter` (buffered
//! writer, `hound::WavSpec` construction, header-patch-on-finalize idea),
//! trimmed to §4.9's actual contract: no punch in/out, pre-roll, multi-take
//! management, or disk-space probing — those are DAW-session features this
//! core's Non-goals exclude. Samples are kept interleaved, matching the
//! sample loop's own interleave step (§4 step 6), so the render loop can
//! hand this its output buffer with no extra copy/transpose.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rf_core::Sample;

use crate::FileResult;

/// Returned by [`DiskRecorder::append_buffer`] so the render loop can decide
/// how to flush: synchronously while bouncing (the engine is not blocked on
/// hardware), or by emitting a `RecordedSnippetReady` notification
/// otherwise so a worker thread can flush off the render path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetStatus {
    Accumulating,
    Full { snippet_index: u32 },
}

/// In-memory accumulator, temp-file writer, and final-file assembler.
pub struct DiskRecorder {
    channels: u16,
    sample_rate: u32,
    capacity_frames: usize,
    current: Vec<Sample>,
    temp_dir: PathBuf,
    final_path: PathBuf,
    snippet_paths: Vec<PathBuf>,
    next_snippet_index: u32,
}

impl DiskRecorder {
    /// `capacity_frames` bounds how many frames accumulate in memory before
    /// [`SnippetStatus::Full`] is returned. `temp_dir` holds the raw
    /// intermediate snippets until [`DiskRecorder::finalize`] concatenates
    /// them; it is created if missing.
    pub fn new(
        channels: u16,
        sample_rate: u32,
        capacity_frames: usize,
        temp_dir: impl Into<PathBuf>,
        final_path: impl Into<PathBuf>,
    ) -> FileResult<Self> {
        let temp_dir = temp_dir.into();
        fs::create_dir_all(&temp_dir)?;
        Ok(Self {
            channels,
            sample_rate,
            capacity_frames,
            current: Vec::with_capacity(capacity_frames * channels as usize),
            temp_dir,
            final_path: final_path.into(),
            snippet_paths: Vec::new(),
            next_snippet_index: 0,
        })
    }

    /// Appends one render call's worth of interleaved samples. Returns
    /// `Full` once the in-memory snippet has reached `capacity_frames`;
    /// the caller must then call [`DiskRecorder::flush_current`] (directly
    /// while bouncing, or from a worker after an async notification).
    pub fn append_buffer(&mut self, interleaved: &[Sample]) -> SnippetStatus {
        self.current.extend_from_slice(interleaved);
        if self.current.len() / self.channels as usize >= self.capacity_frames {
            SnippetStatus::Full {
                snippet_index: self.next_snippet_index,
            }
        } else {
            SnippetStatus::Accumulating
        }
    }

    /// Writes the current in-memory snippet to a temp file and clears it.
    /// A no-op (not an error) if nothing has accumulated yet.
    pub fn flush_current(&mut self) -> FileResult<()> {
        if self.current.is_empty() {
            return Ok(());
        }
        let path = self.temp_dir.join(format!("snippet_{:06}.raw", self.next_snippet_index));
        write_raw_f32(&path, &self.current)?;
        self.snippet_paths.push(path);
        self.next_snippet_index += 1;
        self.current.clear();
        Ok(())
    }

    /// Flushes any remaining snippet, concatenates every temp snippet into
    /// a finished WAV file at `final_path`, removes the temp files and
    /// directory, and returns the final path. Matches §4.9's bounce-end
    /// contract: "flush the final snippet synchronously, finalize the
    /// file."
    pub fn finalize(&mut self) -> FileResult<PathBuf> {
        self.flush_current()?;

        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };

        if let Some(parent) = self.final_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = hound::WavWriter::create(&self.final_path, spec)?;
        for path in &self.snippet_paths {
            for sample in read_raw_f32(path)? {
                writer.write_sample(sample)?;
            }
        }
        writer.finalize()?;

        for path in self.snippet_paths.drain(..) {
            let _ = fs::remove_file(path);
        }
        let _ = fs::remove_dir(&self.temp_dir);

        log::info!("disk recorder finalized: {}", self.final_path.display());
        Ok(self.final_path.clone())
    }

    pub fn snippet_count(&self) -> usize {
        self.snippet_paths.len()
    }
}

fn write_raw_f32(path: &Path, samples: &[Sample]) -> FileResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for &sample in samples {
        writer.write_all(&(sample as f32).to_le_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

fn read_raw_f32(path: &Path) -> FileResult<Vec<f32>> {
    let bytes = fs::read(path)?;
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn snippet_fills_at_capacity() {
        let dir = tempdir().unwrap();
        let mut recorder = DiskRecorder::new(
            2,
            44_100,
            4,
            dir.path().join("tmp"),
            dir.path().join("out.wav"),
        )
        .unwrap();

        // 3 frames (6 samples) is under capacity.
        assert_eq!(
            recorder.append_buffer(&[0.0; 6]),
            SnippetStatus::Accumulating
        );
        // One more frame reaches the 4-frame capacity.
        assert_eq!(
            recorder.append_buffer(&[0.0; 2]),
            SnippetStatus::Full { snippet_index: 0 }
        );
    }

    #[test]
    fn finalize_concatenates_snippets_into_playable_wav() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.wav");
        let mut recorder =
            DiskRecorder::new(1, 44_100, 2, dir.path().join("tmp"), out.clone()).unwrap();

        let status = recorder.append_buffer(&[1.0, 2.0]);
        assert_eq!(status, SnippetStatus::Full { snippet_index: 0 });
        recorder.flush_current().unwrap();

        recorder.append_buffer(&[3.0]);
        let path = recorder.finalize().unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![1.0, 2.0, 3.0]);
        assert_eq!(path, out);
    }

    #[test]
    fn empty_flush_is_a_no_op() {
        let dir = tempdir().unwrap();
        let mut recorder = DiskRecorder::new(
            2,
            44_100,
            4,
            dir.path().join("tmp"),
            dir.path().join("out.wav"),
        )
        .unwrap();
        recorder.flush_current().unwrap();
        assert_eq!(recorder.snippet_count(), 0);
    }
}
