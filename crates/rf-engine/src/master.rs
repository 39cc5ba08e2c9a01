//! `MasterStage` (§4.5): the master bus. Applies the master processor
//! chain, then clips to the engine's output range and interleaves into the
//! driver-facing sample slice. Grounded on `rf-master/src/stereo.rs`'s
//! apply-processors-then-clip shape.

use rf_core::{AudioBuffer, Sample};

use crate::processor::ProcessorChain;

/// §4.5 clamp bound: "clamp to ±0.9999, never full-scale ±1.0" (avoids
/// intersample overs on lossy downstream encoders).
const CLAMP: Sample = 0.9999;

pub struct MasterStage {
    processor_chain: ProcessorChain,
    pub volume: f64,
    pub mono: bool,
}

impl MasterStage {
    pub fn new() -> Self {
        Self {
            processor_chain: ProcessorChain::new(),
            volume: 1.0,
            mono: false,
        }
    }

    pub fn processor_chain_mut(&mut self) -> &mut ProcessorChain {
        &mut self.processor_chain
    }

    /// §4.5: runs the master chain over `master`, then clamps and
    /// interleaves into `out` (`out.len() == master.frame_count() *
    /// master.channel_count()`).
    pub fn render(&mut self, master: &mut AudioBuffer, out: &mut [Sample]) {
        let mono = self.mono;
        for slot in self.processor_chain.active_processors_mut() {
            slot.process(master, mono);
        }

        let channels = master.channel_count();
        let frames = master.frame_count();
        debug_assert_eq!(out.len(), channels * frames);

        for frame in 0..frames {
            for c in 0..channels {
                let sample = (master.channel(c)[frame] * self.volume).clamp(-CLAMP, CLAMP);
                out[frame * channels + c] = sample;
            }
        }
    }
}

impl Default for MasterStage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_clamps_and_interleaves() {
        let mut master = AudioBuffer::new(2, 2);
        master.channel_mut(0).copy_from_slice(&[2.0, -2.0]);
        master.channel_mut(1).copy_from_slice(&[0.5, -0.5]);

        let mut stage = MasterStage::new();
        let mut out = vec![0.0; 4];
        stage.render(&mut master, &mut out);

        assert_eq!(out, vec![CLAMP, 0.5, -CLAMP, -0.5]);
    }

    #[test]
    fn volume_scales_before_clamp() {
        let mut master = AudioBuffer::new(1, 1);
        master.channel_mut(0)[0] = 1.0;

        let mut stage = MasterStage::new();
        stage.volume = 0.5;
        let mut out = vec![0.0; 1];
        stage.render(&mut master, &mut out);
        assert_eq!(out, vec![0.5]);
    }
}
