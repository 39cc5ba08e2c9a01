//! `EventSource` — the sequencer-controller interface the render core
//! queries by buffer range (§6). Treated as an external collaborator per
//! §1; this crate ships one reference in-memory implementation (grounded on
//! the teacher's `rf-event::manager` command-queue shape, simplified since
//! there is no host-language bridge here) for tests and the CLI demo.

use std::collections::HashMap;

use rf_core::ChannelId;

use crate::event::AudioEvent;

/// Per-channel event lists populated by [`EventSource::gather`]. Callers
/// (the render core) own these views; the event store never transfers
/// ownership of its events (§9 design note: "per-render event lists are
/// views, not ownership transfers").
pub trait EventSource {
    /// Populates each channel's timeline-event list with events whose
    /// `[start, start+length)` overlaps `[start_pos, start_pos+length)`.
    ///
    /// `clear_first` clears a channel's previous event list before adding
    /// matches; `forward` distinguishes the primary query from the
    /// post-loop supplemental query (§4.4) and is informational only for a
    /// plain in-memory store. Returns whether the window, as requested,
    /// represents the sequencer having looped.
    fn gather(
        &self,
        channels: &mut HashMap<ChannelId, Vec<AudioEvent>>,
        start_pos: i64,
        length: i64,
        forward: bool,
        clear_first: bool,
    ) -> bool;

    /// Is the sequencer currently playing?
    fn playing(&self) -> bool;

    /// Rescale event positions after a tempo change (§4.7). The render core
    /// calls this once, after committing the queued tempo.
    fn rescale_events(&mut self, ratio: f64);
}

/// A plain `Vec`-backed reference [`EventSource`]. Not meant for production
/// hosts (which maintain their own timeline data structure) — this exists
/// so the render core can be exercised end-to-end without a host.
#[derive(Debug, Default)]
pub struct EventStore {
    playing: bool,
    events: HashMap<ChannelId, Vec<AudioEvent>>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    pub fn add_event(&mut self, channel: ChannelId, event: AudioEvent) {
        self.events.entry(channel).or_default().push(event);
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

impl EventSource for EventStore {
    fn gather(
        &self,
        out: &mut HashMap<ChannelId, Vec<AudioEvent>>,
        start_pos: i64,
        length: i64,
        _forward: bool,
        clear_first: bool,
    ) -> bool {
        if length <= 0 {
            if clear_first {
                for list in out.values_mut() {
                    list.clear();
                }
            }
            return false;
        }

        for (channel, events) in &self.events {
            let dst = out.entry(*channel).or_default();
            if clear_first {
                dst.clear();
            }
            for event in events {
                if !event.locked && event.overlaps(start_pos, length) {
                    dst.push(event.clone());
                }
            }
        }
        true
    }

    fn playing(&self) -> bool {
        self.playing
    }

    fn rescale_events(&mut self, ratio: f64) {
        for list in self.events.values_mut() {
            for event in list.iter_mut() {
                event.start = (event.start as f64 * ratio).round() as i64;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventContent;

    #[test]
    fn gather_only_returns_overlapping_unlocked_events() {
        let mut store = EventStore::new();
        let ch = ChannelId(0);
        store.add_event(ch, AudioEvent::timeline(1, 0, EventContent::mono(vec![1.0; 4])));
        store.add_event(ch, AudioEvent::timeline(2, 100, EventContent::mono(vec![1.0; 4])));
        store.add_event(
            ch,
            AudioEvent::timeline(3, 2, EventContent::mono(vec![1.0; 4])).locked(true),
        );

        let mut out = HashMap::new();
        store.gather(&mut out, 0, 8, true, true);

        let list = &out[&ch];
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, 1);
    }

    #[test]
    fn rescale_events_scales_start_by_ratio() {
        let mut store = EventStore::new();
        let ch = ChannelId(0);
        store.add_event(ch, AudioEvent::timeline(1, 1000, EventContent::mono(vec![1.0])));
        store.rescale_events(4.0 / 3.0);
        assert_eq!(store.events[&ch][0].start, 1333);
    }
}
