//! `rf-cli`: a small demo binary wiring the render-core crates together the
//! way a host application would (SPEC_FULL.md §0) — live playback through
//! the default device, offline bounce-to-file, and device enumeration.
//! Config layering follows the `ampactor-sonido` CLI crate: an optional
//! TOML file supplies defaults, `clap` flags override them.

mod config;
mod demo;
mod tone;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use parking_lot::Mutex;
use rf_audio::{AudioConfig, ChannelNotifier, CpalDriver, DriverAdapter, NullDriver};
use rf_core::Notification;
use rf_engine::{make_push_callback, start_push_driver, BounceRange, Engine, EngineConfig, FeatureFlags, RenderLoop};
use rf_event::{EventSource, EventStore};
use rf_file::DiskRecorder;

use crate::config::FileConfig;

#[derive(Parser)]
#[command(name = "rf-cli", author, version, about = "Real-time audio rendering core demo", long_about = None)]
struct Cli {
    /// Optional TOML config file; CLI flags override whatever it sets.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play a synthesized demo session live through the default output device.
    Play(PlayArgs),
    /// Render the demo session's loop range to a WAV file, faster than real time.
    Bounce(BounceArgs),
    /// List available audio output/input devices.
    Devices,
}

#[derive(Args)]
struct PlayArgs {
    #[arg(long, default_value_t = 44_100)]
    sample_rate: u32,
    #[arg(long, default_value_t = 1024)]
    buffer_size: usize,
    #[arg(long, default_value_t = 120.0)]
    tempo: f64,
    /// How long to play before stopping.
    #[arg(long, default_value_t = 4.0)]
    duration_secs: f64,
    /// Drive with the null (no-hardware) pull-mode driver instead of a real device.
    #[arg(long)]
    null: bool,
}

#[derive(Args)]
struct BounceArgs {
    #[arg(long, default_value_t = 44_100)]
    sample_rate: u32,
    #[arg(long, default_value_t = 1024)]
    buffer_size: usize,
    #[arg(long, default_value_t = 120.0)]
    tempo: f64,
    /// How many bars of the demo session to render.
    #[arg(long, default_value_t = 1)]
    bars: u32,
    #[arg(long, default_value = "bounce.wav")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Play(args) => run_play(cli.config.as_deref(), args),
        Command::Bounce(args) => run_bounce(cli.config.as_deref(), args),
        Command::Devices => run_devices(),
    }
}

fn layered_config(
    config_path: Option<&Path>,
    sample_rate: u32,
    buffer_size: usize,
    tempo: f64,
) -> anyhow::Result<(EngineConfig, FeatureFlags)> {
    let mut config = EngineConfig {
        sample_rate,
        buffer_size,
        tempo_bpm: tempo,
        output_channels: 2,
        ..EngineConfig::default()
    };
    let mut flags = FeatureFlags::default();
    if let Some(path) = config_path {
        FileConfig::load(path)?.apply(&mut config, &mut flags);
    }
    Ok((config, flags))
}

fn audio_config(config: &EngineConfig) -> AudioConfig {
    AudioConfig {
        sample_rate: config.sample_rate,
        buffer_size: config.buffer_size,
        output_channels: config.output_channels,
        input_channels: config.input_channels,
    }
}

fn drain_notifications(rx: &crossbeam_channel::Receiver<Notification>) {
    while let Ok(notification) = rx.try_recv() {
        log::info!("notification: {notification:?}");
    }
}

fn run_devices() -> anyhow::Result<()> {
    println!("-- output devices --");
    for device in rf_audio::list_output_devices()? {
        println!("  {}{}", device.name, if device.is_default { " (default)" } else { "" });
    }
    println!("-- input devices --");
    for device in rf_audio::list_input_devices()? {
        println!("  {}{}", device.name, if device.is_default { " (default)" } else { "" });
    }
    Ok(())
}

fn run_play(config_path: Option<&Path>, args: PlayArgs) -> anyhow::Result<()> {
    let (config, flags) = layered_config(config_path, args.sample_rate, args.buffer_size, args.tempo)?;

    let (notifier, notifications) = ChannelNotifier::channel();
    let mut engine = Engine::new(config.clone(), flags, Box::new(notifier));
    let mut store = EventStore::new();
    demo::build_demo(&mut engine, &mut store);

    let bar = engine.transport().samples_per_bar();
    engine.transport_mut().set_loop_range(0, bar - 1);
    engine.transport_mut().set_playing(true);
    engine.start();

    if args.null {
        let mut render_loop = RenderLoop::new(NullDriver::new(audio_config(&config)));
        render_loop.open_driver(&engine)?;
        let total_buffers = ((args.duration_secs * config.sample_rate as f64) / config.buffer_size as f64).ceil() as usize;
        for _ in 0..total_buffers {
            render_loop.render_once(&mut engine, &mut store)?;
            drain_notifications(&notifications);
        }
        render_loop.driver_mut().destroy()?;
        engine.stop();
    } else {
        let engine = Arc::new(Mutex::new(engine));
        let event_source: Arc<Mutex<dyn EventSource + Send>> = Arc::new(Mutex::new(store));
        let callback = make_push_callback(engine.clone(), event_source);
        let mut driver = CpalDriver::new(audio_config(&config), callback, false);
        driver = start_push_driver(driver, engine.clone())?;

        let elapsed = Duration::from_secs_f64(args.duration_secs);
        let tick = Duration::from_millis(100);
        let mut waited = Duration::ZERO;
        while waited < elapsed {
            std::thread::sleep(tick);
            waited += tick;
            drain_notifications(&notifications);
        }

        driver.destroy()?;
        engine.lock().stop();
    }

    Ok(())
}

fn run_bounce(config_path: Option<&Path>, args: BounceArgs) -> anyhow::Result<()> {
    let (config, flags) = layered_config(config_path, args.sample_rate, args.buffer_size, args.tempo)?;

    let (notifier, notifications) = ChannelNotifier::channel();
    let mut engine = Engine::new(config.clone(), flags, Box::new(notifier));
    let mut store = EventStore::new();
    demo::build_demo(&mut engine, &mut store);

    let bar = engine.transport().samples_per_bar();
    engine.transport_mut().set_loop_range(0, bar - 1);

    let bounce_end = bar as i64 * args.bars.max(1) as i64;
    let temp_dir = std::env::temp_dir().join("rf-cli-bounce");
    let recorder = DiskRecorder::new(config.output_channels, config.sample_rate, config.buffer_size * 8, temp_dir, args.output.clone())?;

    engine.begin_bounce(BounceRange { start: 0, end: bounce_end }, recorder);
    engine.start();

    let mut render_loop = RenderLoop::new(rf_audio::RecordingNullDriver::new(audio_config(&config)));
    render_loop.open_driver(&engine)?;
    render_loop.run_until_stopped(&mut engine, &mut store)?;

    drain_notifications(&notifications);
    println!("bounced {bounce_end} frames to {}", args.output.display());
    Ok(())
}
