//! `Transport` (§3/§4.6/§4.7): sequencer position, loop bounds, tempo and
//! time-signature state, queued tempo changes. Grounded on
//! `rf-engine/src/playback.rs`'s `PlaybackPosition` (atomic position, loop
//! bounds) generalized to carry the bar/beat/step and queued-tempo fields
//! §3 specifies; the per-sample step/marker bookkeeping below is a direct
//! port of `audioengine.cpp`'s combined interleave/transport-advance loop
//! (lines ~420-470).

use rf_core::{Notification, Notifier, QueuedTempo, TempoState};

/// What happened when a single sample frame's position was advanced —
/// collected by `Engine::render_into` to decide which notifications to fire
/// and whether the loop wrapped mid-buffer (§4.4/§4.7).
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportEvent {
    pub stepped: bool,
    /// The step index computed this frame, valid only when `stepped` is set
    /// (§4.6: `stepPosition = floor(bufferPosition / samplesPerStep)`,
    /// wrapped to `minStepPosition` if beyond `maxStepPosition`).
    pub step_position: i64,
    pub marker_hit: bool,
    pub looped: bool,
}

pub struct Transport {
    sample_rate: f64,
    tempo: TempoState,
    queued: QueuedTempo,
    position: i64,
    min_position: i64,
    max_position: i64,
    /// §3: `stepPosition ∈ [minStepPosition, maxStepPosition]`, derived from
    /// the buffer-position loop range and `samplesPerStep` whenever either
    /// changes (`set_loop_range`, `commit_queued_tempo`).
    step_position: i64,
    min_step_position: i64,
    max_step_position: i64,
    marked_position: Option<i64>,
    playing: bool,
}

impl Transport {
    pub fn new(sample_rate: f64, tempo_bpm: f64, beats_per_bar: u32, beat_unit: u32, steps_per_bar: u32) -> Self {
        let tempo = TempoState::new(sample_rate, tempo_bpm, beats_per_bar, beat_unit, steps_per_bar);
        Self {
            sample_rate,
            tempo,
            queued: QueuedTempo::default(),
            position: 0,
            min_position: 0,
            max_position: 0,
            step_position: 0,
            min_step_position: 0,
            max_step_position: 0,
            marked_position: None,
            playing: false,
        }
    }

    /// Recomputes `min_step_position`/`max_step_position` from the current
    /// buffer-position loop range and `samplesPerStep` (§3, §4.6). Called
    /// whenever either input changes.
    fn recompute_step_bounds(&mut self) {
        let step_len = self.tempo.samples_per_step.max(1);
        self.min_step_position = self.min_position / step_len;
        self.max_step_position = self.max_position / step_len;
    }

    #[inline]
    pub fn step_position(&self) -> i64 {
        self.step_position
    }

    #[inline]
    pub fn min_step_position(&self) -> i64 {
        self.min_step_position
    }

    #[inline]
    pub fn max_step_position(&self) -> i64 {
        self.max_step_position
    }

    #[inline]
    pub fn position(&self) -> i64 {
        self.position
    }

    #[inline]
    pub fn min_position(&self) -> i64 {
        self.min_position
    }

    #[inline]
    pub fn max_position(&self) -> i64 {
        self.max_position
    }

    /// §3/§11: `max_position == 0` means "no explicit loop end set"; callers
    /// should treat the loop range as unbounded until one is configured.
    pub fn has_loop_range(&self) -> bool {
        self.max_position > self.min_position
    }

    pub fn set_loop_range(&mut self, min_position: i64, max_position: i64) {
        self.min_position = min_position.max(0);
        self.max_position = max_position.max(self.min_position);
        if self.position < self.min_position || self.position > self.max_position {
            self.position = self.min_position;
        }
        self.recompute_step_bounds();
    }

    pub fn set_position(&mut self, position: i64) {
        self.position = position.max(0);
    }

    #[inline]
    pub fn playing(&self) -> bool {
        self.playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    #[inline]
    pub fn tempo(&self) -> &TempoState {
        &self.tempo
    }

    #[inline]
    pub fn samples_per_bar(&self) -> i64 {
        self.tempo.samples_per_bar
    }

    #[inline]
    pub fn samples_per_step(&self) -> i64 {
        self.tempo.samples_per_step
    }

    /// §4.7: queue a tempo/time-signature change for commit at the next
    /// buffer boundary (never applied mid-buffer, to avoid a discontinuity
    /// within a single render call).
    pub fn queue_tempo(&mut self, tempo_bpm: Option<f64>, beats_per_bar: Option<u32>, beat_unit: Option<u32>) {
        if let Some(bpm) = tempo_bpm {
            self.queued.tempo_bpm = Some(bpm);
        }
        if let Some(bpb) = beats_per_bar {
            self.queued.beats_per_bar = Some(bpb);
        }
        if let Some(bu) = beat_unit {
            self.queued.beat_unit = Some(bu);
        }
    }

    pub fn set_marked_position(&mut self, position: Option<i64>) {
        self.marked_position = position;
    }

    /// §4.7: applies any queued tempo at a buffer boundary, rescaling
    /// position and loop range proportionally so sequencer phase doesn't
    /// jump (scenario 4: tempo 120→90, ratio 4/3). Returns the rescale
    /// ratio applied, if any; the caller (`Engine`) is responsible for
    /// broadcasting `SEQUENCER_TEMPO_UPDATED` and calling
    /// `EventSource::rescale_events(ratio)`.
    pub fn commit_queued_tempo(&mut self) -> Option<f64> {
        if self.queued.is_empty() {
            return None;
        }
        let old_tempo = self.tempo.tempo_bpm;
        let loop_length = self.max_position - self.min_position;

        if let Some(bpm) = self.queued.tempo_bpm.take() {
            self.tempo.tempo_bpm = bpm;
        }
        if let Some(bpb) = self.queued.beats_per_bar.take() {
            self.tempo.beats_per_bar = bpb;
        }
        if let Some(bu) = self.queued.beat_unit.take() {
            self.tempo.beat_unit = bu;
        }
        self.tempo.recompute(self.sample_rate);

        let ratio = old_tempo / self.tempo.tempo_bpm;
        self.min_position = (self.min_position as f64 * ratio).round() as i64;
        self.max_position = self.min_position + (loop_length as f64 * ratio).round() as i64;
        self.position = (self.position as f64 * ratio).round() as i64;
        if let Some(marker) = self.marked_position {
            if marker > 0 {
                self.marked_position = Some((marker as f64 * ratio).round() as i64);
            }
        }
        self.recompute_step_bounds();
        Some(ratio)
    }

    /// §4.4/§4.7 per-sample transport advance: step/marker detection, then
    /// position increment with loop wrap back to `min_position`. Mirrors
    /// `audioengine.cpp`'s combined interleave/advance loop body.
    pub fn advance_sample(&mut self) -> TransportEvent {
        let mut event = TransportEvent::default();

        let step_len = self.tempo.samples_per_step.max(1);
        event.stepped = self.position % step_len == 0;
        if event.stepped {
            // §4.6: `stepPosition = floor(bufferPosition / samplesPerStep)`,
            // wrapped to `minStepPosition` if it would run past
            // `maxStepPosition`.
            let mut step = self.position / step_len;
            if step > self.max_step_position {
                step = self.min_step_position;
            }
            self.step_position = step;
            event.step_position = step;
        }

        if let Some(marker) = self.marked_position {
            event.marker_hit = self.position == marker;
        }

        self.position += 1;
        // `max_position` is the inclusive last valid frame (§8 scenario 3:
        // `maxBufferPosition = samplesPerBar - 1`), so the loop only wraps
        // once position would run *past* it, not upon reaching it.
        if self.has_loop_range() && self.position > self.max_position {
            self.position = self.min_position;
            event.looped = true;
        }

        event
    }

    pub fn notify_if_needed(&self, event: TransportEvent, notifier: &dyn Notifier) {
        if event.marker_hit {
            notifier.notify(Notification::MarkerPositionReached);
        }
    }
}
