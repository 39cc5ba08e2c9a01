//! Bar/beat/step timing math (§3).
//!
//! Mirrors the formula shape of the teacher's tempo map (`PPQ`, ticks-per-bar)
//! but scoped to what the render core actually needs: samples-per-bar,
//! -beat and -step at a given tempo/time-signature, recomputed whenever a
//! tempo change commits (§4.7).

/// A tempo and time signature pair, plus the derived sample counts the
/// transport advances by.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TempoState {
    pub tempo_bpm: f64,
    pub beats_per_bar: u32,
    pub beat_unit: u32,
    pub steps_per_bar: u32,
    pub samples_per_bar: i64,
    pub samples_per_beat: i64,
    pub samples_per_step: i64,
}

impl TempoState {
    pub fn new(sample_rate: f64, tempo_bpm: f64, beats_per_bar: u32, beat_unit: u32, steps_per_bar: u32) -> Self {
        let mut state = Self {
            tempo_bpm,
            beats_per_bar,
            beat_unit,
            steps_per_bar,
            samples_per_bar: 0,
            samples_per_beat: 0,
            samples_per_step: 0,
        };
        state.recompute(sample_rate);
        state
    }

    /// Recompute `samples_per_bar/beat/step` per the §3 formulas:
    ///
    /// ```text
    /// samplesPerBar  = round(sampleRate * 60 * beatsPerBar * 4 / (tempo * beatUnit))
    /// samplesPerBeat = samplesPerBar / beatsPerBar
    /// samplesPerStep = samplesPerBar / stepsPerBar
    /// ```
    pub fn recompute(&mut self, sample_rate: f64) {
        let bar = (sample_rate * 60.0 * self.beats_per_bar as f64 * 4.0
            / (self.tempo_bpm * self.beat_unit as f64))
            .round() as i64;
        self.samples_per_bar = bar.max(1);
        self.samples_per_beat = self.samples_per_bar / self.beats_per_bar.max(1) as i64;
        self.samples_per_step = self.samples_per_bar / self.steps_per_bar.max(1) as i64;
    }
}

/// Queued tempo/time-signature change, committed only at the end of a
/// render call (§3 invariant, §4.7).
#[derive(Debug, Clone, Copy, Default)]
pub struct QueuedTempo {
    pub tempo_bpm: Option<f64>,
    pub beats_per_bar: Option<u32>,
    pub beat_unit: Option<u32>,
}

impl QueuedTempo {
    pub fn is_empty(&self) -> bool {
        self.tempo_bpm.is_none() && self.beats_per_bar.is_none() && self.beat_unit.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_per_bar_matches_spec_example() {
        // 120 BPM, 44100 Hz, 4/4 => 88200 samples per bar (§8 scenario 4).
        let state = TempoState::new(44100.0, 120.0, 4, 4, 16);
        assert_eq!(state.samples_per_bar, 88200);
    }

    #[test]
    fn tempo_change_rescales_bar_length() {
        let mut state = TempoState::new(44100.0, 120.0, 4, 4, 16);
        state.tempo_bpm = 90.0;
        state.recompute(44100.0);
        assert_eq!(state.samples_per_bar, 117600);
    }
}
