//! `Engine` (§4.8) and `RenderLoop`: the top-level owner of channels, the
//! mix graph, the master stage, the transport, and (optionally) disk
//! recording. Grounded on `rf-audio/src/engine.rs`'s `AudioEngine` (thread
//! lifecycle around an owned handle) collapsed per the original's
//! single-process-singleton design into one owned handle; the render
//! algorithm itself is `audioengine.cpp`'s `AudioEngine::render` ported step
//! for step (lines 237-510). Mutation from outside the render thread goes
//! through a `parking_lot::Mutex<Engine>` taken between renders (§5), not a
//! command queue.
//!
//! `Engine` never owns a `Box<dyn DriverAdapter>` directly: a push-model
//! driver (`CpalDriver`) needs to call back into the engine from a closure
//! it hands to the driver at construction time, which would make
//! `Engine -> Driver -> Callback -> Engine` an unbreakable ownership cycle
//! if `Engine` held the driver itself. Instead `render_into` is the single
//! driver-agnostic entry point; `RenderLoop` wraps *pull*-mode drivers and
//! owns both the driver and a `&mut Engine` borrow for the duration of
//! `run`, while push-model callback construction happens externally around
//! an `Arc<parking_lot::Mutex<Engine>>` (see `RenderLoop::make_callback`).

use std::sync::Arc;

use parking_lot::Mutex;
use rf_audio::{AudioResult, DriverAdapter};
use rf_core::{AudioBuffer, ChannelId, Notification, Notifier, Sample};
use rf_event::EventSource;
use rf_file::{DiskRecorder, SnippetStatus};

use crate::channel::AudioChannel;
use crate::config::{EngineConfig, FeatureFlags};
use crate::error::{EngineError, EngineResult};
use crate::master::MasterStage;
use crate::mixgraph::MixGraph;
use crate::transport::Transport;

/// Outcome of a single `render_into` call (§11: "a stop observed mid-render
/// ... implemented as an early return ... carrying `RenderOutcome::Stopped`
/// rather than a silent write").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Wrote(usize),
    Stopped,
}

/// A bounce (offline render) target range, in transport frames.
#[derive(Debug, Clone, Copy)]
pub struct BounceRange {
    pub start: i64,
    pub end: i64,
}

pub struct Engine {
    config: EngineConfig,
    flags: FeatureFlags,
    channels: Vec<AudioChannel>,
    input_channel: Option<AudioChannel>,
    mix_graph: MixGraph,
    master: AudioBuffer,
    master_stage: MasterStage,
    transport: Transport,
    notifier: Box<dyn Notifier>,
    disk_recorder: Option<DiskRecorder>,
    bounce_range: Option<BounceRange>,
    running: bool,
    input_scratch: Vec<Sample>,
}

impl Engine {
    pub fn new(config: EngineConfig, flags: FeatureFlags, notifier: Box<dyn Notifier>) -> Self {
        let transport = Transport::new(
            config.sample_rate as f64,
            config.tempo_bpm,
            config.beats_per_bar,
            config.beat_unit,
            config.steps_per_bar,
        );
        let input_channel = if config.input_channels > 0 {
            Some(AudioChannel::new(ChannelId(u32::MAX), config.output_channels as usize, config.buffer_size, 1))
        } else {
            None
        };
        Self {
            master: AudioBuffer::new(config.output_channels.max(1) as usize, config.buffer_size.max(1)),
            input_scratch: vec![0.0; config.input_channels.max(0) as usize * config.buffer_size.max(1)],
            channels: Vec::new(),
            input_channel,
            mix_graph: MixGraph::new(),
            master_stage: MasterStage::new(),
            transport,
            notifier,
            disk_recorder: None,
            bounce_range: None,
            running: false,
            config,
            flags,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn flags(&self) -> FeatureFlags {
        self.flags
    }

    pub fn flags_mut(&mut self) -> &mut FeatureFlags {
        &mut self.flags
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport {
        &mut self.transport
    }

    pub fn master_stage_mut(&mut self) -> &mut MasterStage {
        &mut self.master_stage
    }

    pub fn channel_mut(&mut self, id: ChannelId) -> Option<&mut AudioChannel> {
        self.channels.iter_mut().find(|c| c.id() == id)
    }

    /// Adds a new channel, sized for the engine's current buffer/cache
    /// geometry, and pre-warms the mix graph's scratch entry for it so the
    /// first `render_into` after this call doesn't allocate (§5).
    pub fn add_channel(&mut self, id: ChannelId, cache_capacity_frames: usize) -> &mut AudioChannel {
        self.mix_graph.reserve_channel(id);
        self.channels.push(AudioChannel::new(
            id,
            self.config.output_channels as usize,
            self.config.buffer_size,
            cache_capacity_frames,
        ));
        self.channels.last_mut().expect("just pushed")
    }

    pub fn start(&mut self) {
        self.running = true;
        log::info!("engine started: {} Hz, {} frames", self.config.sample_rate, self.config.buffer_size);
    }

    pub fn stop(&mut self) {
        self.running = false;
        log::info!("engine stopped");
    }

    /// §4.8/§7: the driver failed to open. Broadcasts
    /// `ErrorHardwareUnavailable` and leaves `running` false so the caller
    /// never enters the render loop.
    pub fn notify_driver_unavailable(&self) {
        log::error!("audio driver unavailable, not starting render loop");
        self.notifier.notify(Notification::ErrorHardwareUnavailable);
    }

    pub fn reset(&mut self) {
        self.transport.set_position(0);
        for channel in &mut self.channels {
            channel.invalidate_cache();
        }
        log::info!("engine reset");
    }

    /// Begins a bounce (offline render faster than real time) over
    /// `[start, end)`, enabling disk output. Caller then drives `render_into`
    /// (typically via `RenderLoop`) until it observes `BounceComplete`.
    pub fn begin_bounce(&mut self, range: BounceRange, recorder: DiskRecorder) {
        self.bounce_range = Some(range);
        self.disk_recorder = Some(recorder);
        self.flags.bouncing = true;
        self.flags.record_output_to_disk = true;
        self.transport.set_playing(true);
        self.transport.set_position(range.start);
    }

    pub fn set_disk_recorder(&mut self, recorder: DiskRecorder) {
        self.disk_recorder = Some(recorder);
    }

    /// §4 end to end: gather, mix, master, per-sample transport advance,
    /// disk recording, tempo commit. `input` is this call's captured device
    /// input (already pulled via `DriverAdapter::get_input`, or empty if no
    /// input device); `output` receives the interleaved rendered samples.
    pub fn render_into(
        &mut self,
        event_source: &mut dyn EventSource,
        input: &[Sample],
        output: &mut [Sample],
    ) -> EngineResult<RenderOutcome> {
        if !self.running {
            return Ok(RenderOutcome::Stopped);
        }

        let n = self.config.buffer_size as i64;
        let pos = self.transport.position();
        let min_pos = self.transport.min_position();
        let max_pos = self.transport.max_position();
        let samples_per_bar = self.transport.samples_per_bar();

        let gather = self
            .mix_graph
            .begin(&mut self.master, event_source, pos, n, min_pos, max_pos);

        // §11: device input monitoring, mixed before the per-channel loop.
        if (self.flags.record_device_input || self.flags.record_input_to_disk) && !input.is_empty() {
            if let Some(input_channel) = self.input_channel.as_mut() {
                let frames = input.len().min(input_channel.output_buffer().frame_count());
                input_channel.output_buffer_mut().channel_mut(0)[..frames].copy_from_slice(&input[..frames]);
                input_channel.apply_processor_chain(false);
                if input_channel.volume() > 0.0 {
                    input_channel.mix_buffer(&mut self.master, input_channel.volume())?;
                }
            }
        }

        self.mix_graph.mix_channels(
            &mut self.channels,
            &mut self.master,
            self.transport.playing(),
            pos,
            min_pos,
            max_pos,
            samples_per_bar,
            gather,
            self.flags.channel_caching,
        )?;

        self.master_stage.render(&mut self.master, output);

        let mut looped = false;
        if self.transport.playing() {
            for frame in 0..n {
                let event = self.transport.advance_sample();
                if event.stepped {
                    self.notifier.notify(Notification::SequencerPositionUpdated { frame_offset: frame as u32 });
                }
                self.transport.notify_if_needed(event, self.notifier.as_ref());
                looped |= event.looped;
            }
        }

        if !self.running {
            return Ok(RenderOutcome::Stopped);
        }

        self.handle_disk_recording(output, looped)?;

        if let Some(ratio) = self.transport.commit_queued_tempo() {
            event_source.rescale_events(ratio);
            self.notifier.notify(Notification::SequencerTempoUpdated);
            log::debug!("tempo committed, rescale ratio {ratio}");
        }

        Ok(RenderOutcome::Wrote(output.len()))
    }

    fn handle_disk_recording(&mut self, output: &[Sample], looped: bool) -> EngineResult<()> {
        let should_record = (self.transport.playing() && self.flags.record_output_to_disk) || self.flags.record_input_to_disk;
        if !should_record {
            return Ok(());
        }
        let Some(recorder) = self.disk_recorder.as_mut() else {
            return Ok(());
        };

        let status = if self.flags.record_input_to_disk {
            if let Some(input_channel) = self.input_channel.as_ref() {
                recorder.append_buffer(input_channel.output_buffer().channel(0))
            } else {
                SnippetStatus::Accumulating
            }
        } else {
            recorder.append_buffer(output)
        };

        if let Some(range) = self.bounce_range {
            let pos = self.transport.position();
            let bounce_done = looped || pos == range.start || pos >= range.end;
            if self.flags.bouncing && bounce_done {
                recorder.finalize()?;
                self.notifier.notify(Notification::BounceComplete);
                self.stop();
                self.transport.set_playing(false);
                self.flags.bouncing = false;
                self.flags.record_output_to_disk = false;
                return Ok(());
            }
        }

        if let SnippetStatus::Full { snippet_index } = status {
            if self.flags.bouncing {
                recorder.flush_current()?;
            } else {
                self.notifier.notify(Notification::RecordedSnippetReady { snippet_index });
            }
        }

        Ok(())
    }
}

/// Drives a pull-model driver (`NullDriver`/`RecordingNullDriver`) against
/// an `Engine`, looping synchronously during a bounce (§11 Open Question 2)
/// rather than recursing.
pub struct RenderLoop<D: DriverAdapter> {
    driver: D,
}

impl<D: DriverAdapter> RenderLoop<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// §4.8/§7: opens the driver. On failure, broadcasts
    /// `ErrorHardwareUnavailable` through `engine`'s notifier and returns the
    /// error without starting the render loop.
    pub fn open_driver(&mut self, engine: &Engine) -> AudioResult<()> {
        if let Err(err) = self.driver.create() {
            engine.notify_driver_unavailable();
            return Err(err);
        }
        Ok(())
    }

    /// Runs one render call: pulls input, renders, and writes output unless
    /// bouncing (bounce output only goes to disk, never to the driver —
    /// §4.9: "writing to hardware makes it both unnecessarily audible and
    /// stalls execution").
    pub fn render_once(&mut self, engine: &mut Engine, event_source: &mut dyn EventSource) -> EngineResult<RenderOutcome> {
        let channels = engine.config().output_channels.max(1) as usize;
        let frames = engine.config().buffer_size;
        let input_channels = engine.config().input_channels as usize;

        let mut input = vec![0.0; input_channels * frames];
        if input_channels > 0 {
            self.driver.get_input(&mut input);
        }

        let mut output = vec![0.0; channels * frames];
        let outcome = engine.render_into(event_source, &input, &mut output)?;

        if matches!(outcome, RenderOutcome::Wrote(_)) && !engine.flags().bouncing {
            self.driver.write_output(&output);
        }
        Ok(outcome)
    }

    /// Drives render calls until the engine stops (e.g. a bounce completes),
    /// per §11 Open Question 2: a synchronous loop, not recursive `render`
    /// calls.
    pub fn run_until_stopped(&mut self, engine: &mut Engine, event_source: &mut dyn EventSource) -> EngineResult<()> {
        loop {
            match self.render_once(engine, event_source)? {
                RenderOutcome::Stopped => return Ok(()),
                RenderOutcome::Wrote(_) => {
                    if !engine.running {
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Builds the `AudioCallback` closure a push-model `CpalDriver` needs at
/// construction time. The driver only ever holds a cloned `Arc`, never true
/// ownership of `Engine`, so `Engine -> Driver -> Callback -> Engine` never
/// forms a cycle.
pub fn make_push_callback(
    engine: Arc<Mutex<Engine>>,
    event_source: Arc<Mutex<dyn EventSource + Send>>,
) -> rf_audio::AudioCallback {
    Box::new(move |input: &[Sample], output: &mut [Sample]| {
        let mut engine = engine.lock();
        let mut event_source = event_source.lock();
        if let Err(err) = engine.render_into(&mut *event_source, input, output) {
            log::error!("render_into failed in audio callback: {err}");
            output.fill(0.0);
        }
    })
}

/// Creates and starts a push-model driver, wiring its callback to
/// `engine`/`event_source` through the `Arc<Mutex<_>>` indirection above.
/// §4.8/§7: on a failed `create`, broadcasts `ErrorHardwareUnavailable`
/// through `engine`'s notifier before propagating the error.
pub fn start_push_driver(
    mut driver: rf_audio::CpalDriver,
    engine: Arc<Mutex<Engine>>,
) -> AudioResult<rf_audio::CpalDriver> {
    if let Err(err) = driver.create() {
        engine.lock().notify_driver_unavailable();
        return Err(err);
    }
    Ok(driver)
}
