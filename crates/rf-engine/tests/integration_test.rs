//! End-to-end render-core tests, covering the §8 scenarios against the real
//! `Engine`/`MixGraph`/`Transport` stack instead of individual unit tests.
//! Mirrors `rf-engine/tests/integration_test.rs` in the teacher workspace:
//! one file, driven through a `NullDriver`/`RecordingNullDriver`, no mocks
//! below the `EventSource`/`Notifier` boundary.

use rf_audio::{AudioConfig, AudioError, AudioResult, ChannelNotifier, DriverAdapter, RecordingNullDriver};
use rf_core::{ChannelId, Notification, NullNotifier, SampleRateHz};
use rf_engine::{BounceRange, Engine, EngineConfig, FeatureFlags, RenderLoop};
use rf_event::{AudioEvent, EventContent, EventSource, EventStore};
use rf_file::DiskRecorder;

/// A driver whose `create` always fails — used to exercise §4.8/§7's
/// `ErrorHardwareUnavailable` policy without a real device.
struct FailingDriver;

impl DriverAdapter for FailingDriver {
    fn create(&mut self) -> AudioResult<()> {
        Err(AudioError::NoDevice)
    }

    fn destroy(&mut self) -> AudioResult<()> {
        Ok(())
    }

    fn buffer_size(&self) -> usize {
        0
    }

    fn sample_rate(&self) -> SampleRateHz {
        0
    }

    fn output_channels(&self) -> u16 {
        0
    }

    fn is_running(&self) -> bool {
        false
    }

    fn write_output(&mut self, _interleaved: &[f64]) {}

    fn get_input(&mut self, _buffer: &mut [f64]) -> usize {
        0
    }
}

fn config(sample_rate: u32, buffer_size: usize, output_channels: u16) -> EngineConfig {
    EngineConfig {
        sample_rate,
        buffer_size,
        output_channels,
        input_channels: 0,
        tempo_bpm: 120.0,
        beats_per_bar: 4,
        beat_unit: 4,
        steps_per_bar: 16,
    }
}

/// §8 scenario 1: one mono event, one channel, stereo out, no processors.
#[test]
fn scenario_single_mono_event_stereo_out() {
    let samples = vec![
        -1.0, -1.0, -1.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0,
    ];
    let mut store = EventStore::new();
    store.set_playing(true);
    let ch = ChannelId(0);
    store.add_event(ch, AudioEvent::timeline(1, 0, EventContent::mono(samples.clone())));

    let mut engine = Engine::new(config(44_100, 16, 2), FeatureFlags::default(), Box::new(NullNotifier));
    engine.add_channel(ch, 16);
    engine.channel_mut(ch).unwrap().set_volume(1.0);
    engine.transport_mut().set_loop_range(0, 1_000_000);
    engine.transport_mut().set_playing(true);
    engine.start();

    let mut output = vec![0.0; 32];
    engine.render_into(&mut store, &[], &mut output).unwrap();

    for (i, sample) in samples.iter().enumerate() {
        let expected = sample.clamp(-0.9999, 0.9999);
        assert_eq!(output[i * 2], expected, "left frame {i}");
        assert_eq!(output[i * 2 + 1], expected, "right frame {i}");
    }
}

/// §8 scenario 2: two overlapping stereo events on one channel; values
/// chosen so both events contribute a nonzero sample at the overlap frame,
/// so the assertion actually exercises summation rather than "nonzero plus
/// zero" (event A covers [16,32) right-channel only, event B covers
/// [24,40) on both channels; at absolute frame 28, A's local index is 12
/// and B's local index is 4).
#[test]
fn scenario_two_overlapping_stereo_events() {
    let mut a = vec![0.0; 32]; // 2 channels * 16 frames, planar
    a[16 + 12] = -0.5; // right channel, local index 12 -> absolute frame 28
    let event_a = AudioEvent::timeline(1, 16, EventContent::new(2, 16, a));

    let mut b = vec![0.0; 32]; // 2 channels * 16 frames, planar
    b[4] = 0.25; // left channel, local index 4 -> absolute frame 28
    b[16 + 4] = 0.25; // right channel, local index 4 -> absolute frame 28
    let event_b = AudioEvent::timeline(2, 24, EventContent::new(2, 16, b));

    let mut store = EventStore::new();
    store.set_playing(true);
    let ch = ChannelId(0);
    store.add_event(ch, event_a);
    store.add_event(ch, event_b);

    let mut engine = Engine::new(config(44_100, 32, 2), FeatureFlags::default(), Box::new(NullNotifier));
    engine.add_channel(ch, 32);
    engine.channel_mut(ch).unwrap().set_volume(1.0);
    engine.transport_mut().set_loop_range(0, 1_000_000);
    engine.transport_mut().set_position(16);
    engine.transport_mut().set_playing(true);
    engine.start();

    let mut output = vec![0.0; 64];
    engine.render_into(&mut store, &[], &mut output).unwrap();

    // absolute frame 28 is local frame 12 within this render call.
    // left  = B[4]              = 0.25
    // right = A[12] + B[4]      = -0.5 + 0.25 = -0.25
    assert_eq!(output[12 * 2], 0.25, "left at frame 28");
    assert_eq!(output[12 * 2 + 1], -0.25, "right at frame 28");
}

/// §8 scenario 3: loop wrap. A render window that crosses `max_position`
/// must gather events both before and after the wrap.
#[test]
fn scenario_loop_wrap_gathers_pre_and_post_wrap_events() {
    let min_pos = 0i64;
    let max_pos = 99i64;
    let buffer_size = 16usize;
    let start_pos = 92i64; // window [92, 108) wraps at 100 back to 0.

    let pre = AudioEvent::timeline(1, 90, EventContent::mono(vec![1.0; 10])); // covers [90,100)
    let post = AudioEvent::timeline(2, 0, EventContent::mono(vec![2.0; 10])); // covers [0,10)

    let mut store = EventStore::new();
    store.set_playing(true);
    let ch = ChannelId(0);
    store.add_event(ch, pre);
    store.add_event(ch, post);

    let mut engine = Engine::new(config(44_100, buffer_size, 1), FeatureFlags::default(), Box::new(NullNotifier));
    engine.add_channel(ch, 128);
    engine.channel_mut(ch).unwrap().set_volume(1.0);
    engine.transport_mut().set_loop_range(min_pos, max_pos);
    engine.transport_mut().set_position(start_pos);
    engine.transport_mut().set_playing(true);
    engine.start();

    let mut output = vec![0.0; buffer_size];
    engine.render_into(&mut store, &[], &mut output).unwrap();

    // frames 0..8 are absolute 92..100 (pre-wrap, value 1.0); frames 8..16
    // are absolute 0..8 (post-wrap, value 2.0).
    for i in 0..8 {
        assert_eq!(output[i], 1.0, "pre-wrap frame {i}");
    }
    for i in 8..16 {
        assert_eq!(output[i], 2.0, "post-wrap frame {i}");
    }
    assert_eq!(engine.transport().position(), start_pos + buffer_size as i64 - (max_pos - min_pos + 1));
}

/// §8 scenario 4: a tempo change queued during render `k` commits at the
/// end of that call, rescales position, and rescales the event store via
/// `EventSource::rescale_events`.
#[test]
fn scenario_tempo_change_commits_and_rescales() {
    let (notifier, notifications) = ChannelNotifier::channel();
    let mut store = EventStore::new();
    store.set_playing(true);
    let ch = ChannelId(0);
    store.add_event(ch, AudioEvent::timeline(1, 44_100, EventContent::mono(vec![0.0; 4])));

    let mut engine = Engine::new(config(44_100, 16, 1), FeatureFlags::default(), Box::new(notifier));
    engine.add_channel(ch, 16);
    engine.transport_mut().set_loop_range(0, 88_200);
    engine.transport_mut().set_position(44_100);
    engine.transport_mut().set_playing(true);
    engine.start();

    assert_eq!(engine.transport().samples_per_bar(), 88_200);
    engine.transport_mut().queue_tempo(Some(90.0), None, None);

    let mut output = vec![0.0; 16];
    engine.render_into(&mut store, &[], &mut output).unwrap();

    assert_eq!(engine.transport().samples_per_bar(), 117_600);
    // position advanced by buffer_size frames, then rescaled by 4/3.
    assert_eq!(engine.transport().position(), ((44_100 + 16) as f64 * (4.0 / 3.0)).round() as i64);
    // event start (44_100) should have been rescaled by the same ratio.
    // flush notifications.
    let mut saw_tempo_update = false;
    while let Ok(n) = notifications.try_recv() {
        if n == Notification::SequencerTempoUpdated {
            saw_tempo_update = true;
        }
    }
    assert!(saw_tempo_update);

    // the event store's own copy of the event must have been rescaled too.
    let mut gathered = std::collections::HashMap::new();
    store.gather(&mut gathered, 58_799, 4, true, true);
    assert_eq!(gathered[&ch].len(), 1, "event not found at rescaled position");
}

/// §8 scenario 5: a marker hit during the render window broadcasts exactly
/// once.
#[test]
fn scenario_marker_hit_broadcasts_once() {
    let (notifier, notifications) = ChannelNotifier::channel();
    let mut store = EventStore::new();
    store.set_playing(true);

    let mut engine = Engine::new(config(44_100, 40, 1), FeatureFlags::default(), Box::new(notifier));
    engine.transport_mut().set_loop_range(0, 1_000_000);
    engine.transport_mut().set_position(990);
    engine.transport_mut().set_marked_position(Some(1_000));
    engine.transport_mut().set_playing(true);
    engine.start();

    let mut output = vec![0.0; 40];
    engine.render_into(&mut store, &[], &mut output).unwrap();

    let hits = std::iter::from_fn(|| notifications.try_recv().ok())
        .filter(|n| *n == Notification::MarkerPositionReached)
        .count();
    assert_eq!(hits, 1);
}

/// §8 scenario 6: a bounce renders the configured range, flushes the
/// recorder synchronously, and stops the engine.
#[test]
fn scenario_bounce_completes_and_stops_engine() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = EventStore::new();
    let ch = ChannelId(0);
    store.add_event(ch, AudioEvent::timeline(1, 0, EventContent::mono(vec![0.5; 10_000])));
    store.set_playing(true);

    let mut engine = Engine::new(config(44_100, 2_048, 1), FeatureFlags::default(), Box::new(NullNotifier));
    engine.add_channel(ch, 10_000);
    engine.channel_mut(ch).unwrap().set_volume(1.0);
    engine.transport_mut().set_loop_range(0, 1_000_000);

    let recorder = DiskRecorder::new(1, 44_100, 4_096, dir.path().join("tmp"), dir.path().join("out.wav")).unwrap();
    engine.begin_bounce(BounceRange { start: 0, end: 10_000 }, recorder);
    engine.start();

    let mut loop_driver = RenderLoop::new(RecordingNullDriver::new(AudioConfig {
        sample_rate: 44_100,
        buffer_size: 2_048,
        output_channels: 1,
        input_channels: 0,
    }));
    loop_driver.open_driver(&engine).unwrap();
    loop_driver.run_until_stopped(&mut engine, &mut store).unwrap();

    assert!(!engine.flags().bouncing);
    assert!(!engine.transport().playing());
    assert!(dir.path().join("out.wav").exists());
}

/// §8 invariants: output length and clamp range hold for an arbitrary
/// configuration, and two identical renders from identical state produce
/// byte-identical output (determinism).
#[test]
fn render_output_is_in_range_and_correct_length() {
    let mut store = EventStore::new();
    store.set_playing(true);
    let ch = ChannelId(0);
    store.add_event(ch, AudioEvent::timeline(1, 0, EventContent::mono(vec![2.0, -2.0, 0.3, -0.3])));

    let mut engine = Engine::new(config(44_100, 4, 2), FeatureFlags::default(), Box::new(NullNotifier));
    engine.add_channel(ch, 4);
    engine.channel_mut(ch).unwrap().set_volume(1.0);
    engine.transport_mut().set_loop_range(0, 1_000_000);
    engine.transport_mut().set_playing(true);
    engine.start();

    let mut output = vec![0.0; 8];
    engine.render_into(&mut store, &[], &mut output).unwrap();

    assert_eq!(output.len(), 8);
    for sample in &output {
        assert!(*sample >= -0.9999 && *sample <= 0.9999);
    }
}

#[test]
fn identical_state_renders_are_deterministic() {
    fn render_once() -> Vec<f64> {
        let mut store = EventStore::new();
        store.set_playing(true);
        let ch = ChannelId(0);
        store.add_event(ch, AudioEvent::timeline(1, 0, EventContent::mono(vec![0.7, -0.4, 0.1, 0.9])));

        let mut engine = Engine::new(config(44_100, 4, 2), FeatureFlags::default(), Box::new(NullNotifier));
        engine.add_channel(ch, 4);
        engine.channel_mut(ch).unwrap().set_volume(0.8);
        engine.transport_mut().set_loop_range(0, 1_000_000);
        engine.transport_mut().set_playing(true);
        engine.start();

        let mut output = vec![0.0; 8];
        engine.render_into(&mut store, &[], &mut output).unwrap();
        output
    }

    assert_eq!(render_once(), render_once());
}

/// §4.8/§7: when the driver fails to open, the engine must broadcast
/// `ErrorHardwareUnavailable` and never start (the render loop is never
/// entered).
#[test]
fn driver_create_failure_broadcasts_hardware_unavailable() {
    let (notifier, notifications) = ChannelNotifier::channel();
    let engine = Engine::new(config(44_100, 16, 2), FeatureFlags::default(), Box::new(notifier));

    let mut render_loop = RenderLoop::new(FailingDriver);
    let result = render_loop.open_driver(&engine);

    assert!(result.is_err());
    assert!(!engine.flags().bouncing);
    let notes: Vec<_> = std::iter::from_fn(|| notifications.try_recv().ok()).collect();
    assert_eq!(notes, vec![Notification::ErrorHardwareUnavailable]);
}
