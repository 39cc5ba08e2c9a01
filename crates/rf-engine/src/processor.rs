//! `Processor` and `ProcessorChain` (§4.2). Grounded on the teacher's
//! `rf-engine::node::AudioNode` trait (`process`, `reset`, `set_sample_rate`,
//! `latency`, `as_any`/`as_any_mut`), narrowed to the single opaque contract
//! §3 specifies: DSP internals are out of scope here, so only the two
//! methods the mix graph actually calls survive.

use rf_core::{AudioBuffer, Sample};

/// A single DSP stage. Opaque to the render core beyond these two methods
/// (§3: "Processor. Opaque; exposes `process(buffer, mono)` and
/// `isCacheable()`").
pub trait Processor: Send {
    fn process(&mut self, buffer: &mut AudioBuffer, mono: bool);

    /// Whether this processor's output may be "baked" into a channel cache
    /// (§4.2). Stateless, purely additive processors (gain, a fixed EQ)
    /// answer `true`; anything with per-render-call state (an LFO, an
    /// envelope follower) must answer `false`.
    fn is_cacheable(&self) -> bool {
        true
    }
}

/// One chain slot: the processor plus whether it currently participates in
/// `active_processors` (§4.2: "`activeProcessors()` returns only enabled
/// ones in order").
pub struct ProcessorSlot {
    processor: Box<dyn Processor>,
    pub enabled: bool,
}

impl ProcessorSlot {
    fn new(processor: Box<dyn Processor>) -> Self {
        Self {
            processor,
            enabled: true,
        }
    }

    #[inline]
    pub fn is_cacheable(&self) -> bool {
        self.processor.is_cacheable()
    }

    #[inline]
    pub fn process(&mut self, buffer: &mut AudioBuffer, mono: bool) {
        self.processor.process(buffer, mono);
    }
}

/// Insertion-ordered processor list (§4.2). No concurrency guarantees —
/// callers must not mutate a chain while its owning channel is mid-render
/// (§5).
#[derive(Default)]
pub struct ProcessorChain {
    slots: Vec<ProcessorSlot>,
}

impl ProcessorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, processor: Box<dyn Processor>) -> usize {
        self.slots.push(ProcessorSlot::new(processor));
        self.slots.len() - 1
    }

    pub fn set_enabled(&mut self, index: usize, enabled: bool) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.enabled = enabled;
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Insertion-ordered, enabled-only processors (§4.2's `activeProcessors`).
    pub fn active_processors_mut(&mut self) -> impl Iterator<Item = &mut ProcessorSlot> {
        self.slots.iter_mut().filter(|slot| slot.enabled)
    }
}

/// A processor that adds a fixed offset to every sample — used by tests to
/// exercise the cacheable-prefix/must-cache bookkeeping without needing a
/// real DSP stage.
#[cfg(test)]
pub(crate) struct ConstantGain {
    pub gain: Sample,
    pub cacheable: bool,
}

#[cfg(test)]
impl Processor for ConstantGain {
    fn process(&mut self, buffer: &mut AudioBuffer, _mono: bool) {
        for c in 0..buffer.channel_count() {
            for sample in buffer.channel_mut(c).iter_mut() {
                *sample *= self.gain;
            }
        }
    }

    fn is_cacheable(&self) -> bool {
        self.cacheable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_processors_skip_disabled() {
        let mut chain = ProcessorChain::new();
        chain.push(Box::new(ConstantGain {
            gain: 2.0,
            cacheable: true,
        }));
        let idx = chain.push(Box::new(ConstantGain {
            gain: 4.0,
            cacheable: true,
        }));
        chain.set_enabled(idx, false);

        let mut buffer = AudioBuffer::new(1, 2);
        buffer.channel_mut(0).copy_from_slice(&[1.0, 1.0]);
        for slot in chain.active_processors_mut() {
            slot.process(&mut buffer, false);
        }
        assert_eq!(buffer.channel(0), &[2.0, 2.0]);
    }
}
