//! `DriverAdapter` — the boundary between the render core and the outside
//! world (§6): create/destroy a hardware stream, hand the render core its
//! per-buffer input, and accept its rendered output. Grounded on
//! `audioengine.cpp`'s OpenSL/AAudio driver glue and the teacher's
//! `AudioStream`/`get_host`/`get_default_output_device` pair in
//! `stream.rs`/`device.rs`.

use rf_core::Sample;

use crate::{
    get_default_input_device, get_default_output_device, AudioCallback, AudioConfig, AudioResult,
    AudioStream,
};

/// What a render caller needs from a driver each buffer: the previous
/// input snapshot (empty if no input device/monitoring) and a place to
/// write rendered output.
pub trait DriverAdapter: Send {
    /// Starts the underlying stream. Idempotent if already running.
    fn create(&mut self) -> AudioResult<()>;

    /// Stops the underlying stream. Idempotent if already stopped.
    fn destroy(&mut self) -> AudioResult<()>;

    /// Buffer size this driver was configured with, in frames.
    fn buffer_size(&self) -> usize;

    /// Sample rate this driver was configured with.
    fn sample_rate(&self) -> rf_core::SampleRateHz;

    /// Output channel count this driver writes.
    fn output_channels(&self) -> u16;

    fn is_running(&self) -> bool;

    /// Pull-model output path (§6 `writeOutput`): hands the driver a fully
    /// rendered, interleaved buffer. Only meaningful for pull-mode drivers
    /// (`NullDriver`/`RecordingNullDriver`) driven from `RenderLoop`; a
    /// push-model driver like `CpalDriver` already receives its output via
    /// the `AudioCallback` closure it was constructed with, so this is a
    /// no-op there — calling it on a `CpalDriver` indicates the caller
    /// picked the wrong integration path.
    fn write_output(&mut self, interleaved: &[Sample]);

    /// Pull-model input path (§6 `getInput`): fills `buffer` with the most
    /// recent captured input frames, returning how many frames were
    /// written. Same push-vs-pull caveat as `write_output`.
    fn get_input(&mut self, buffer: &mut [Sample]) -> usize;
}

/// Realtime driver backed by `cpal`. The render callback itself lives in
/// `rf-engine` (which owns the `MixGraph`); this adapter only owns the
/// hardware stream and forwards cpal's interleaved f32 buffers through the
/// planar-f64 `AudioCallback` boundary (handled inside `stream.rs`).
pub struct CpalDriver {
    stream: Option<AudioStream>,
    config: AudioConfig,
    callback: Option<AudioCallback>,
    use_input: bool,
}

impl CpalDriver {
    pub fn new(config: AudioConfig, callback: AudioCallback, use_input: bool) -> Self {
        Self {
            stream: None,
            config,
            callback: Some(callback),
            use_input,
        }
    }
}

impl DriverAdapter for CpalDriver {
    fn create(&mut self) -> AudioResult<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        let output_device = get_default_output_device()?;
        let input_device = if self.use_input {
            get_default_input_device().ok()
        } else {
            None
        };

        let callback = self
            .callback
            .take()
            .expect("CpalDriver::create called twice without an intervening destroy");

        let stream = AudioStream::new(&output_device, input_device.as_ref(), self.config.clone(), callback)?;
        stream.start()?;
        self.stream = Some(stream);
        log::info!("audio driver started: {} Hz, {} frames", self.config.sample_rate, self.config.buffer_size);
        Ok(())
    }

    fn destroy(&mut self) -> AudioResult<()> {
        if let Some(stream) = self.stream.take() {
            stream.stop()?;
            log::info!("audio driver stopped");
        }
        Ok(())
    }

    fn buffer_size(&self) -> usize {
        self.config.buffer_size
    }

    fn sample_rate(&self) -> rf_core::SampleRateHz {
        self.config.sample_rate
    }

    fn output_channels(&self) -> u16 {
        self.config.output_channels
    }

    fn is_running(&self) -> bool {
        self.stream.as_ref().map(|s| s.is_running()).unwrap_or(false)
    }

    fn write_output(&mut self, _interleaved: &[Sample]) {
        log::warn!("CpalDriver::write_output called; output is delivered via the AudioCallback closure instead");
    }

    fn get_input(&mut self, _buffer: &mut [Sample]) -> usize {
        log::warn!("CpalDriver::get_input called; input is delivered via the AudioCallback closure instead");
        0
    }
}

/// A driver with no hardware behind it: the render core pulls it
/// synchronously, as fast as the CPU allows, instead of being paced by a
/// hardware clock. Grounded on the original's `mock_opensl_io.cpp` test
/// harness — the same "no device, no wait" driving idea, generalized here
/// to also serve as the bounce-to-file engine (§4.9: bounce renders faster
/// than realtime precisely because nothing paces it against a clock).
pub struct NullDriver {
    config: AudioConfig,
    running: bool,
    input: Vec<Sample>,
}

impl NullDriver {
    pub fn new(config: AudioConfig) -> Self {
        Self {
            config,
            running: false,
            input: Vec::new(),
        }
    }

    /// Feeds synthetic input frames for the next `get_input` call — used by
    /// tests exercising §11 device-input monitoring without real hardware.
    pub fn queue_input(&mut self, frames: Vec<Sample>) {
        self.input = frames;
    }
}

impl DriverAdapter for NullDriver {
    fn create(&mut self) -> AudioResult<()> {
        self.running = true;
        Ok(())
    }

    fn destroy(&mut self) -> AudioResult<()> {
        self.running = false;
        Ok(())
    }

    fn buffer_size(&self) -> usize {
        self.config.buffer_size
    }

    fn sample_rate(&self) -> rf_core::SampleRateHz {
        self.config.sample_rate
    }

    fn output_channels(&self) -> u16 {
        self.config.output_channels
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn write_output(&mut self, _interleaved: &[Sample]) {
        // Nothing downstream of a NullDriver consumes output; discarding it
        // is the point (§4.9 bounce renders through a NullDriver-like path
        // precisely because no hardware output is wanted).
    }

    fn get_input(&mut self, buffer: &mut [Sample]) -> usize {
        let n = self.input.len().min(buffer.len());
        buffer[..n].copy_from_slice(&self.input[..n]);
        for sample in &mut buffer[n..] {
            *sample = 0.0;
        }
        self.input.drain(..n);
        n
    }
}

/// Records every rendered buffer instead of discarding it — used by
/// integration tests that need to assert on actual output samples without
/// a real device.
pub struct RecordingNullDriver {
    inner: NullDriver,
    pub captured: Vec<Vec<Sample>>,
}

impl RecordingNullDriver {
    pub fn new(config: AudioConfig) -> Self {
        Self {
            inner: NullDriver::new(config),
            captured: Vec::new(),
        }
    }

    pub fn push(&mut self, buffer: Vec<Sample>) {
        self.captured.push(buffer);
    }
}

impl DriverAdapter for RecordingNullDriver {
    fn create(&mut self) -> AudioResult<()> {
        self.inner.create()
    }

    fn destroy(&mut self) -> AudioResult<()> {
        self.inner.destroy()
    }

    fn buffer_size(&self) -> usize {
        self.inner.buffer_size()
    }

    fn sample_rate(&self) -> rf_core::SampleRateHz {
        self.inner.sample_rate()
    }

    fn output_channels(&self) -> u16 {
        self.inner.output_channels()
    }

    fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    fn write_output(&mut self, interleaved: &[Sample]) {
        self.captured.push(interleaved.to_vec());
    }

    fn get_input(&mut self, buffer: &mut [Sample]) -> usize {
        self.inner.get_input(buffer)
    }
}
