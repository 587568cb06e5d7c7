//! # Fretboard Note Tracker - Terminal Front-End
//!
//! Listens on the default input device, tracks the stabilized note, and
//! shows where to play it on the fingerboard.
//!
//! ## Architecture
//! - **Audio callback**: cpal stream feeding the engine's lock-free ring
//! - **Analysis thread**: owned by the engine, 50 cycles per second
//! - **Main thread**: refresh loop reading the published atomics every
//!   100 ms and resolving the displayed note to a string/fret
//! - **Quit watcher**: small thread that waits for Enter on stdin

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{Receiver, bounded, tick};
use fretboard_core::{
    capture,
    engine::{EngineShared, PitchEngine},
    fretboard::{PositionResolver, Tuning},
    note,
    profile::SessionProfile,
};

/// Display refresh period for the status line.
const REFRESH_PERIOD: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(
    name = "fretboard-cli",
    version,
    about = "Real-time note tracking and fretboard positions from the default microphone"
)]
struct Args {
    /// Profile file with the session settings
    #[arg(long, default_value = "session_profile.json")]
    profile: String,

    /// Override the profile's confidence threshold (0.0 to 0.95)
    #[arg(long)]
    sensitivity: Option<f32>,

    /// Override the profile's hold time in milliseconds (0 to 10000)
    #[arg(long)]
    hold_ms: Option<u32>,

    /// Override the profile's tuning by name (standard, drop-d, ...)
    #[arg(long)]
    tuning: Option<String>,

    /// Write the effective settings back to the profile file on exit
    #[arg(long)]
    save_profile: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr so they do not fight the status line.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let profile = effective_profile(&args)?;

    let (device, config) = capture::open_default_input()?;
    let mut engine = PitchEngine::new(config.sample_rate().0);

    let shared = engine.shared();
    shared.state().set_sensitivity(profile.sensitivity);
    shared.state().set_hold_time_ms(profile.hold_time_ms);

    let stream = capture::start_capture(&device, config, engine.shared())?;
    engine.start();

    println!("Listening. Press Enter to quit.");

    let ticker = tick(REFRESH_PERIOD);
    let quit = spawn_quit_watcher();
    let mut resolver = PositionResolver::new();

    loop {
        crossbeam_channel::select! {
            recv(ticker) -> _ => {
                print_status(&shared, &mut resolver, &profile);
            }
            recv(quit) -> _ => {
                break;
            }
        }
    }

    println!();
    tracing::info!("shutting down");

    // Stop feeding samples first, then join the analysis thread.
    drop(stream);
    engine.stop();

    if args.save_profile {
        save_profile(&profile, &args.profile)?;
        tracing::info!(path = %args.profile, "session profile saved");
    }

    Ok(())
}

/// Loads the profile file (defaults when it does not exist) and applies the
/// command-line overrides.
fn effective_profile(args: &Args) -> Result<SessionProfile> {
    let mut profile = if Path::new(&args.profile).exists() {
        let profile = load_profile(&args.profile)?;
        tracing::info!(path = %args.profile, "session profile loaded");
        profile
    } else {
        SessionProfile::default()
    };

    if let Some(sensitivity) = args.sensitivity {
        profile.sensitivity = sensitivity;
    }
    if let Some(hold_ms) = args.hold_ms {
        profile.hold_time_ms = hold_ms;
    }
    if let Some(name) = &args.tuning {
        profile.tuning = Tuning::by_name(name).with_context(|| {
            format!(
                "unknown tuning {name:?} (known: {})",
                Tuning::names().join(", ")
            )
        })?;
    }

    Ok(profile)
}

/// Redraws the one-line status: note, pitch, cents, level, and position.
fn print_status(shared: &EngineShared, resolver: &mut PositionResolver, profile: &SessionProfile) {
    let state = shared.state();
    let midi_note = state.displayed_midi_note();
    let pitch = state.displayed_pitch_hz();
    let cents = state.displayed_cents();
    let level = state.signal_level();

    let position = if midi_note >= 0 {
        resolver.resolve(
            midi_note,
            &profile.tuning,
            profile.preferred_position,
            profile.finger_range,
            profile.total_frets,
        )
    } else {
        None
    };
    let position_text = match position {
        // Strings are numbered from 1 for display, highest first.
        Some(p) => format!("string {} fret {}", p.string_index + 1, p.fret),
        None => "-".to_string(),
    };

    print!(
        "\r{:>4}  {pitch:7.2} Hz  {cents:+6.1} c  level {level:.3}  {position_text:<18}",
        note::midi_note_name(midi_note)
    );
    let _ = std::io::stdout().flush();
}

/// Waits for Enter on a dedicated thread and signals the main loop.
fn spawn_quit_watcher() -> Receiver<()> {
    let (quit_tx, quit_rx) = bounded(1);
    thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        let _ = quit_tx.send(());
    });
    quit_rx
}

/// Saves the session profile to a JSON file.
fn save_profile(profile: &SessionProfile, path: &str) -> Result<()> {
    let json_string = serde_json::to_string_pretty(profile)?;
    let mut file = File::create(path).with_context(|| format!("creating {path}"))?;
    file.write_all(json_string.as_bytes())?;
    Ok(())
}

/// Loads a session profile from a JSON file.
fn load_profile(path: &str) -> Result<SessionProfile> {
    let mut file = File::open(path).with_context(|| format!("opening {path}"))?;
    let mut data = String::new();
    file.read_to_string(&mut data)?;
    let profile = serde_json::from_str(&data).with_context(|| format!("parsing {path}"))?;
    Ok(profile)
}
