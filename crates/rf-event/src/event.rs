//! `AudioEvent` — a piece of scheduled (or live) audio content (§3).
//!
//! Struct ergonomics (builder methods, `serde` derives) follow the
//! teacher's `rf-event::MiddlewareEvent`; the actual mix/loop-wrap
//! arithmetic is a port of `AudioEngine::render`'s per-event loop in
//! `audioengine.cpp` (lines 320–352), since the teacher's own event type is
//! a Wwise-style middleware trigger, not a timeline clip.

use rf_core::AudioBuffer;
use serde::{Deserialize, Serialize};

/// Per-channel sample content an event mixes into a channel buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventContent {
    channels: usize,
    frames: usize,
    samples: Vec<f64>,
}

impl EventContent {
    pub fn new(channels: usize, frames: usize, samples: Vec<f64>) -> Self {
        assert_eq!(samples.len(), channels * frames);
        Self {
            channels,
            frames,
            samples,
        }
    }

    pub fn mono(samples: Vec<f64>) -> Self {
        let frames = samples.len();
        Self::new(1, frames, samples)
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    #[inline]
    fn sample(&self, channel: usize, frame: usize) -> f64 {
        let c = if self.channels == 1 { 0 } else { channel };
        self.samples[c * self.frames + frame]
    }
}

/// A scheduled (timeline-bound) or always-on (live) piece of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioEvent {
    pub id: u64,
    /// Start offset in frames on the timeline. Unused for live events.
    pub start: i64,
    pub content: EventContent,
    /// A locked event is not read during `gather`/`mixBuffer` (§3 invariant).
    pub locked: bool,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Participates in loop-wrap math using the channel or transport range.
    Timeline,
    /// Unconditionally mixed into the channel buffer every render call.
    Live,
}

impl AudioEvent {
    pub fn timeline(id: u64, start: i64, content: EventContent) -> Self {
        Self {
            id,
            start,
            content,
            locked: false,
            kind: EventKind::Timeline,
        }
    }

    pub fn live(id: u64, content: EventContent) -> Self {
        Self {
            id,
            start: 0,
            content,
            locked: false,
            kind: EventKind::Live,
        }
    }

    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    #[inline]
    pub fn length(&self) -> i64 {
        self.content.frame_count() as i64
    }

    #[inline]
    pub fn end(&self) -> i64 {
        self.start + self.length()
    }

    /// Does this timeline event overlap `[window_start, window_start + window_len)`?
    pub fn overlaps(&self, window_start: i64, window_len: i64) -> bool {
        let window_end = window_start + window_len;
        self.start < window_end && self.end() > window_start
    }

    /// Mixes a *live* event's full content into `dst`, starting at frame 0,
    /// truncated to whichever of `dst`/content is shorter. Live events have
    /// no timeline binding (§3, Glossary: "Live event").
    pub fn mix_live(&self, dst: &mut AudioBuffer) {
        debug_assert_eq!(self.kind, EventKind::Live);
        let frames = dst.frame_count().min(self.content.frame_count());
        for c in 0..dst.channel_count() {
            let dst_c = dst.channel_mut(c);
            for i in 0..frames {
                dst_c[i] += self.content.sample(c, i);
            }
        }
    }

    /// Mixes a *timeline* event's content into `dst`, translating each
    /// destination frame `i` into an absolute sequencer position and, if
    /// that position falls within the event's `[start, end)` range, adding
    /// the corresponding sample (§4.4 step 4, §4.6 loop-wrap).
    ///
    /// `buffer_pos` is the (possibly channel-local) start position for this
    /// render call. When `loop_started` is set, destination frames at or
    /// past `loop_offset` instead map to `min_buffer_pos + (i - loop_offset)`
    /// — the post-wrap continuation gathered by the second `EventSource`
    /// query.
    #[allow(clippy::too_many_arguments)]
    pub fn mix_timeline(
        &self,
        dst: &mut AudioBuffer,
        buffer_pos: i64,
        min_buffer_pos: i64,
        loop_started: bool,
        loop_offset: i64,
    ) {
        debug_assert_eq!(self.kind, EventKind::Timeline);
        if self.locked {
            return;
        }

        let frames = dst.frame_count() as i64;
        for i in 0..frames {
            let abs_pos = if loop_started && i >= loop_offset {
                min_buffer_pos + (i - loop_offset)
            } else {
                buffer_pos + i
            };

            if abs_pos < self.start || abs_pos >= self.end() {
                continue;
            }
            let sample_idx = (abs_pos - self.start) as usize;

            for c in 0..dst.channel_count() {
                dst.channel_mut(c)[i as usize] += self.content.sample(c, sample_idx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono_event(start: i64, samples: &[f64]) -> AudioEvent {
        AudioEvent::timeline(1, start, EventContent::mono(samples.to_vec()))
    }

    #[test]
    fn single_mono_event_duplicates_into_stereo() {
        let samples = [-1.0, -1.0, -1.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0];
        let event = mono_event(0, &samples);

        let mut dst = AudioBuffer::new(2, 16);
        event.mix_timeline(&mut dst, 0, 0, false, 0);

        assert_eq!(dst.channel(0), &samples[..]);
        assert_eq!(dst.channel(1), &samples[..]);
    }

    #[test]
    fn locked_event_is_never_mixed() {
        let event = mono_event(0, &[1.0, 1.0, 1.0, 1.0]).locked(true);
        let mut dst = AudioBuffer::new(1, 4);
        event.mix_timeline(&mut dst, 0, 0, false, 0);
        assert_eq!(dst.channel(0), &[0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn out_of_window_event_contributes_nothing() {
        let event = mono_event(100, &[1.0, 1.0]);
        let mut dst = AudioBuffer::new(1, 4);
        event.mix_timeline(&mut dst, 0, 0, false, 0);
        assert_eq!(dst.channel(0), &[0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn loop_wrap_splices_pre_and_post_wrap_regions() {
        // min=0, max=9 (10-frame loop), render window starts at 8 with N=4.
        // loop_offset = (max - pos) + 1 = (9 - 8) + 1 = 2.
        let pre = mono_event(8, &[10.0, 20.0]); // occupies abs positions 8,9
        let post = mono_event(0, &[30.0, 40.0]); // occupies abs positions 0,1

        let mut dst = AudioBuffer::new(1, 4);
        pre.mix_timeline(&mut dst, 8, 0, true, 2);
        post.mix_timeline(&mut dst, 8, 0, true, 2);

        // i=0 -> abs 8 (pre[0]=10), i=1 -> abs 9 (pre[1]=20)
        // i=2 -> abs 0 (post[0]=30), i=3 -> abs 1 (post[1]=40)
        assert_eq!(dst.channel(0), &[10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn overlapping_events_sum() {
        let a = mono_event(0, &[1.0, 1.0, 1.0, 1.0]);
        let b = mono_event(2, &[10.0, 10.0]);

        let mut dst = AudioBuffer::new(1, 4);
        a.mix_timeline(&mut dst, 0, 0, false, 0);
        b.mix_timeline(&mut dst, 0, 0, false, 0);

        assert_eq!(dst.channel(0), &[1.0, 1.0, 11.0, 11.0]);
    }

    #[test]
    fn live_event_ignores_start_offset() {
        let event = AudioEvent::live(1, EventContent::mono(vec![5.0, 5.0]));
        let mut dst = AudioBuffer::new(1, 4);
        event.mix_live(&mut dst);
        assert_eq!(dst.channel(0), &[5.0, 5.0, 0.0, 0.0]);
    }
}
