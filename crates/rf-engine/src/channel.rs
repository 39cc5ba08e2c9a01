//! `AudioChannel` (§3/§4.3): one voice. Owns its output buffer, processor
//! chain, event lists, and optional rendered-cache. Grounded on the
//! teacher's `rf-engine::track_manager::Track` ownership shape (owns buffer
//! + chain, not events) and on `audioengine.cpp`'s `AudioChannel` fields;
//! the cache read/write mechanics have no literal original counterpart (the
//! reviewed excerpt of `audioengine.cpp` only calls `readCachedBuffer`/
//! `writeChannelCache`, it does not define them) so the wrap-around storage
//! here is a direct, from-scratch implementation of §4.3's description,
//! reusing `AudioBuffer::copy_wrapping_from` for the read side.

use rf_core::{AudioBuffer, ChannelId, RfResult, Sample};
use rf_event::AudioEvent;

use crate::processor::ProcessorChain;

/// A channel's pre-rendered contribution for its full loop length (Glossary:
/// "Channel cache"). Read when `has_cache`; written incrementally across
/// render calls while `is_caching`.
struct ChannelCache {
    buffer: AudioBuffer,
    capacity_frames: usize,
    write_pos: usize,
    written: usize,
    has_cache: bool,
    can_cache: bool,
}

impl ChannelCache {
    fn new(channels: usize, capacity_frames: usize) -> Self {
        let capacity_frames = capacity_frames.max(1);
        Self {
            buffer: AudioBuffer::new(channels.max(1), capacity_frames),
            capacity_frames,
            write_pos: 0,
            written: 0,
            has_cache: false,
            can_cache: true,
        }
    }

    fn resize(&mut self, channels: usize, capacity_frames: usize) {
        self.capacity_frames = capacity_frames.max(1);
        self.buffer.resize(channels.max(1), self.capacity_frames);
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.has_cache = false;
        self.write_pos = 0;
        self.written = 0;
    }

    fn is_caching(&self) -> bool {
        !self.has_cache && self.written > 0
    }

    /// §4.3 `readCachedBuffer`: copies `cache[pos .. pos+F)` into `dst`,
    /// wrapping within the cache's length.
    fn read_into(&self, dst: &mut AudioBuffer, pos: i64) {
        let read_pos = pos.rem_euclid(self.capacity_frames as i64) as usize;
        dst.copy_wrapping_from(&self.buffer, read_pos);
    }

    /// §4.3 `writeCache`: appends `src`'s frames from `read_pos` onward,
    /// wrapping, until the cache reaches capacity. `read_pos` is always `0`
    /// in this engine's usage — the mix graph flushes a channel's *entire*
    /// current buffer in one call rather than partial ranges, since a
    /// render call's buffer is never itself split across a cache boundary.
    fn write(&mut self, src: &AudioBuffer, read_pos: usize) {
        let frames = src.frame_count();
        if read_pos >= frames {
            return;
        }
        let n = frames - read_pos;
        for c in 0..src.channel_count().min(self.buffer.channel_count()) {
            let src_c = src.channel(c);
            for i in 0..n {
                let dest_idx = (self.write_pos + i) % self.capacity_frames;
                self.buffer.channel_mut(c)[dest_idx] = src_c[read_pos + i];
            }
        }
        self.write_pos = (self.write_pos + n) % self.capacity_frames;
        self.written = (self.written + n).min(self.capacity_frames);
        if self.written >= self.capacity_frames {
            self.has_cache = true;
        }
    }
}

pub struct AudioChannel {
    id: ChannelId,
    volume: f64,
    mono: bool,
    max_buffer_position: i64,
    events: Vec<AudioEvent>,
    live_events: Vec<AudioEvent>,
    processor_chain: ProcessorChain,
    output_buffer: AudioBuffer,
    cache: ChannelCache,
}

impl AudioChannel {
    pub fn new(id: ChannelId, output_channels: usize, buffer_size: usize, cache_capacity_frames: usize) -> Self {
        Self {
            id,
            volume: 1.0,
            mono: false,
            max_buffer_position: 0,
            events: Vec::new(),
            live_events: Vec::new(),
            processor_chain: ProcessorChain::new(),
            output_buffer: AudioBuffer::new(output_channels.max(1), buffer_size.max(1)),
            cache: ChannelCache::new(output_channels.max(1), cache_capacity_frames),
        }
    }

    #[inline]
    pub fn id(&self) -> ChannelId {
        self.id
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Invariant (§3): `volume ∈ [0, 1]`.
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    #[inline]
    pub fn mono(&self) -> bool {
        self.mono
    }

    pub fn set_mono(&mut self, mono: bool) {
        self.mono = mono;
    }

    #[inline]
    pub fn max_buffer_position(&self) -> i64 {
        self.max_buffer_position
    }

    /// `0` (or negative) means "use the global transport range" (§3, §11 —
    /// the original guards with `!= 0`; negative positions cannot occur so
    /// treating them as equivalent to unset is a no-op generalization).
    pub fn set_max_buffer_position(&mut self, position: i64) {
        self.max_buffer_position = position.max(0);
    }

    pub fn processor_chain_mut(&mut self) -> &mut ProcessorChain {
        &mut self.processor_chain
    }

    pub fn output_buffer(&self) -> &AudioBuffer {
        &self.output_buffer
    }

    pub fn output_buffer_mut(&mut self) -> &mut AudioBuffer {
        &mut self.output_buffer
    }

    pub fn events(&self) -> &[AudioEvent] {
        &self.events
    }

    pub(crate) fn events_mut(&mut self) -> &mut Vec<AudioEvent> {
        &mut self.events
    }

    pub fn live_events_mut(&mut self) -> &mut Vec<AudioEvent> {
        &mut self.live_events
    }

    #[inline]
    pub fn has_live_events(&self) -> bool {
        !self.live_events.is_empty()
    }

    #[inline]
    pub fn has_cache(&self) -> bool {
        self.cache.has_cache
    }

    #[inline]
    pub fn is_caching(&self) -> bool {
        self.cache.is_caching()
    }

    #[inline]
    pub fn can_cache(&self) -> bool {
        self.cache.can_cache
    }

    pub fn set_can_cache(&mut self, can_cache: bool) {
        self.cache.can_cache = can_cache;
        if !can_cache {
            self.cache.invalidate();
        }
    }

    pub fn invalidate_cache(&mut self) {
        self.cache.invalidate();
    }

    /// §4.1/§4.3 `createOutputBuffer`: sizes `outputBuffer` to
    /// `(outputChannelCount, bufferSize)`. Called from `Engine::start`,
    /// never mid-render (§5 allocation discipline).
    pub fn create_output_buffer(&mut self, output_channels: usize, buffer_size: usize) {
        self.output_buffer.resize(output_channels.max(1), buffer_size.max(1));
    }

    pub fn resize_cache(&mut self, output_channels: usize, capacity_frames: usize) {
        self.cache.resize(output_channels, capacity_frames);
    }

    /// §4.3 `mixBuffer`: adds `outputBuffer * gain` into `dst`.
    pub fn mix_buffer(&self, dst: &mut AudioBuffer, gain: Sample) -> RfResult<()> {
        dst.mix(&self.output_buffer, gain)
    }

    pub(crate) fn read_cache_into_output(&mut self, pos: i64) {
        let AudioChannel { output_buffer, cache, .. } = self;
        cache.read_into(output_buffer, pos);
    }

    pub(crate) fn write_cache(&mut self, read_pos: usize) {
        self.cache.write(&self.output_buffer, read_pos);
    }

    pub(crate) fn mix_timeline_events(&mut self, buffer_pos: i64, min_buffer_pos: i64, loop_started: bool, loop_offset: i64) {
        let AudioChannel { events, output_buffer, .. } = self;
        for event in events.iter() {
            event.mix_timeline(output_buffer, buffer_pos, min_buffer_pos, loop_started, loop_offset);
        }
    }

    pub(crate) fn mix_live_events(&mut self) {
        let AudioChannel { live_events, output_buffer, .. } = self;
        for event in live_events.iter() {
            event.mix_live(output_buffer);
        }
    }

    /// §4.4 step 6: walks the active processor chain, honoring cacheability.
    /// `channel_caching` is the engine-wide feature flag (§6); even with it
    /// on, a channel only actually caches when `can_cache()` and not already
    /// `has_cache()`.
    ///
    /// Per §4.2, "processors before the first non-cacheable processor may be
    /// baked into the channel cache" — so on a cached pass, skip exactly the
    /// cacheable *prefix* (already baked) and run everything from the first
    /// non-cacheable processor onward, unconditionally.
    pub(crate) fn apply_processor_chain(&mut self, channel_caching: bool) {
        let mono = self.mono;
        let has_cache = self.cache.has_cache;
        let mut must_cache = channel_caching && self.cache.can_cache && !has_cache;
        let mut skip_as_cached = has_cache;

        let AudioChannel {
            processor_chain,
            output_buffer,
            cache,
            ..
        } = self;

        for slot in processor_chain.active_processors_mut() {
            let cacheable = slot.is_cacheable();

            if skip_as_cached {
                if cacheable {
                    continue;
                }
                skip_as_cached = false;
            }

            if must_cache && !cacheable {
                cache.write(output_buffer, 0);
                must_cache = false;
            }

            slot.process(output_buffer, mono);
        }

        if must_cache {
            cache.write(output_buffer, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::ConstantGain;

    fn channel() -> AudioChannel {
        AudioChannel::new(ChannelId(0), 1, 4, 8)
    }

    #[test]
    fn cache_fills_then_serves_reads() {
        let mut ch = channel();
        ch.output_buffer_mut().channel_mut(0).copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        ch.write_cache(0);
        assert!(!ch.has_cache()); // capacity 8, only 4 frames written so far
        ch.output_buffer_mut().channel_mut(0).copy_from_slice(&[5.0, 6.0, 7.0, 8.0]);
        ch.write_cache(0);
        assert!(ch.has_cache());

        let mut dst = AudioBuffer::new(1, 4);
        ch.read_cache_into_output_for_test(&mut dst, 6);
        assert_eq!(dst.channel(0), &[7.0, 8.0, 1.0, 2.0]);
    }

    #[test]
    fn cacheable_prefix_is_skipped_once_cached() {
        let mut ch = channel();
        ch.set_can_cache(true);
        let idx_a = ch.processor_chain_mut().push(Box::new(ConstantGain { gain: 2.0, cacheable: true }));
        let idx_b = ch.processor_chain_mut().push(Box::new(ConstantGain { gain: 10.0, cacheable: false }));
        let _ = (idx_a, idx_b);

        ch.output_buffer_mut().channel_mut(0).copy_from_slice(&[1.0, 1.0, 1.0, 1.0]);
        ch.apply_processor_chain(true);
        // gain 2 applied then flushed to cache, then gain 10 applied on top.
        assert_eq!(ch.output_buffer().channel(0), &[20.0, 20.0, 20.0, 20.0]);
        assert!(ch.is_caching());

        // Second pass: simulate `has_cache` by forcing capacity met.
        ch.output_buffer_mut().channel_mut(0).copy_from_slice(&[1.0, 1.0, 1.0, 1.0]);
        ch.write_cache(0); // fills remaining capacity (8 total, 4 written already)
        assert!(ch.has_cache());

        ch.output_buffer_mut().channel_mut(0).copy_from_slice(&[3.0, 3.0, 3.0, 3.0]);
        ch.apply_processor_chain(true);
        // Cacheable gain-2 stage skipped (already baked); non-cacheable gain-10 still runs.
        assert_eq!(ch.output_buffer().channel(0), &[30.0, 30.0, 30.0, 30.0]);
    }

    impl AudioChannel {
        fn read_cache_into_output_for_test(&self, dst: &mut AudioBuffer, pos: i64) {
            self.cache.read_into(dst, pos);
        }
    }
}
