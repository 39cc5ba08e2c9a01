//! Builds a small demo session (a handful of channels with synthesized
//! tones) shared by the `play` and `bounce` subcommands, so both exercise
//! the same render core.

use rf_core::ChannelId;
use rf_engine::Engine;
use rf_event::{AudioEvent, EventStore};

use crate::tone::{click, sine_tone};

/// One bar of a 120 BPM, 4/4, 44.1kHz loop: a sustained tone on channel 0
/// across the whole bar, a second tone on channel 1 covering the first
/// half, and a live "click" event always mixed into channel 1.
pub fn build_demo(engine: &mut Engine, store: &mut EventStore) {
    let sample_rate = engine.config().sample_rate;
    let bar_frames = engine.transport().samples_per_bar().max(1) as usize;

    let lead = ChannelId(0);
    let pad = ChannelId(1);

    engine.add_channel(lead, bar_frames);
    engine.add_channel(pad, bar_frames);
    if let Some(channel) = engine.channel_mut(lead) {
        channel.set_volume(0.8);
    }
    if let Some(channel) = engine.channel_mut(pad) {
        channel.set_volume(0.5);
        channel.live_events_mut().push(AudioEvent::live(100, click(sample_rate as usize / 20, 0.3)));
    }

    store.add_event(lead, AudioEvent::timeline(1, 0, sine_tone(sample_rate, 220.0, bar_frames, 0.6)));
    store.add_event(pad, AudioEvent::timeline(2, 0, sine_tone(sample_rate, 330.0, bar_frames / 2, 0.4)));
    store.set_playing(true);
}
