//! # Analysis Engine Module
//!
//! Ties the pipeline together: the real-time ingest path feeding the capture
//! ring, the periodic analysis cycle (snapshot, estimate, stabilize,
//! publish), and the background thread running that cycle at a fixed cadence.
//!
//! ## Threading
//! - `ingest*` runs on the audio callback: bounded work, no locks, no
//!   allocation.
//! - [`Analyzer::run_cycle`] runs on the background thread (or synchronously
//!   in tests) and is the only writer of the displayed note state.
//! - [`PitchEngine::start`]/[`stop`](PitchEngine::stop) bracket the session;
//!   stop signals the run flag and joins the thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::note;
use crate::pitch;
use crate::ring_buffer::CaptureBuffer;
use crate::stabilizer::NoteStabilizer;
use crate::state::{NO_NOTE, PublishedState};

/// Capacity of the capture ring in samples.
pub const RING_BUFFER_SIZE: usize = 16384;

/// Samples analyzed per cycle. At 44.1 kHz this is ~93 ms of signal, enough
/// for two periods of the lowest searched frequency.
pub const ANALYSIS_WINDOW: usize = 4096;

/// Analysis cycles per second.
pub const CYCLE_RATE_HZ: u32 = 50;

/// Sleep between analysis cycles.
const CYCLE_PERIOD: Duration = Duration::from_millis(1000 / CYCLE_RATE_HZ as u64);

// The analysis window must fit in the ring; checked here once instead of on
// every snapshot.
const _: () = assert!(ANALYSIS_WINDOW <= RING_BUFFER_SIZE);

/// Everything shared between the audio callback, the analysis thread, and
/// observers: the capture ring, the published scalars, and the session
/// sample rate.
#[derive(Debug)]
pub struct EngineShared {
    ring: CaptureBuffer,
    state: PublishedState,
    sample_rate: u32,
}

impl EngineShared {
    pub fn new(sample_rate: u32) -> Self {
        assert!(sample_rate > 0, "sample rate must be non-zero");
        Self {
            ring: CaptureBuffer::new(RING_BUFFER_SIZE),
            state: PublishedState::new(),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Published scalars: displayed note, level, diagnostics, tunables.
    pub fn state(&self) -> &PublishedState {
        &self.state
    }

    /// Feeds one block of mono samples from the real-time path.
    ///
    /// Two passes, both bounded and allocation-free: RMS for the level
    /// meter, then the ring write. Audio passes through unmodified; this
    /// only observes it.
    pub fn ingest(&self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }
        let sum_squares: f32 = samples.iter().map(|&s| s * s).sum();
        self.state
            .publish_level((sum_squares / samples.len() as f32).sqrt());

        self.ring.write(samples);
    }

    /// Feeds one interleaved block, averaging each frame down to mono.
    pub fn ingest_interleaved(&self, data: &[f32], channels: u16) {
        if channels == 0 || data.is_empty() {
            return;
        }
        if channels == 1 {
            self.ingest(data);
            return;
        }

        let channels = channels as usize;
        let frames = data.len() / channels;
        if frames == 0 {
            return;
        }

        let mono = |frame: &[f32]| frame.iter().sum::<f32>() / channels as f32;

        let sum_squares: f32 = data
            .chunks_exact(channels)
            .map(|frame| {
                let sample = mono(frame);
                sample * sample
            })
            .sum();
        self.state.publish_level((sum_squares / frames as f32).sqrt());

        self.ring
            .write_from_iter(data.chunks_exact(channels).map(mono));
    }
}

/// Per-cycle state of the analysis task: the window scratch buffer and the
/// note stabilizer. Owned by the background thread during a live session;
/// tests construct one directly and drive cycles synchronously.
#[derive(Debug)]
pub struct Analyzer {
    window: Vec<f32>,
    stabilizer: NoteStabilizer,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            window: vec![0.0; ANALYSIS_WINDOW],
            stabilizer: NoteStabilizer::new(),
        }
    }

    /// Runs one analysis cycle against the shared core.
    ///
    /// Snapshot the most recent window, estimate the pitch, publish the raw
    /// diagnostics, advance the stabilizer with the current tunables, and
    /// publish whatever it wants displayed.
    pub fn run_cycle(&mut self, shared: &EngineShared) {
        let rms = shared.state.signal_level();
        shared.ring.snapshot_into(&mut self.window);
        let estimate = pitch::estimate(&self.window, shared.sample_rate);
        shared
            .state
            .publish_diagnostics(estimate.frequency_hz, estimate.confidence, rms);

        let sensitivity = shared.state.sensitivity();
        let hold_frames = hold_frames_for(shared.state.hold_time_ms());

        let previous = self.stabilizer.displayed().midi_note;
        let readout = self.stabilizer.step(estimate, sensitivity, hold_frames);
        shared.state.publish_display(
            readout.pitch_hz,
            readout.cents,
            readout.midi_note.unwrap_or(NO_NOTE),
        );

        if readout.midi_note != previous {
            let name = note::midi_note_name(readout.midi_note.unwrap_or(NO_NOTE));
            tracing::debug!(%name, pitch_hz = readout.pitch_hz, "displayed note changed");
        }
    }
}

/// Hold time in milliseconds converted to whole analysis cycles.
fn hold_frames_for(hold_time_ms: u32) -> u32 {
    hold_time_ms * CYCLE_RATE_HZ / 1000
}

/// Owns the shared core and the background analysis thread.
///
/// The audio callback and any observers hold clones of [`shared`](Self::shared);
/// the engine itself only manages the thread. Dropping the engine stops it.
#[derive(Debug)]
pub struct PitchEngine {
    shared: Arc<EngineShared>,
    worker: Option<JoinHandle<()>>,
}

impl PitchEngine {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            shared: Arc::new(EngineShared::new(sample_rate)),
            worker: None,
        }
    }

    /// Handle to the shared core for the capture path and observers.
    pub fn shared(&self) -> Arc<EngineShared> {
        Arc::clone(&self.shared)
    }

    /// Spawns the analysis thread. Does nothing if it is already running.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }
        self.shared.state.set_running(true);

        let shared = Arc::clone(&self.shared);
        self.worker = Some(thread::spawn(move || {
            tracing::info!(
                sample_rate = shared.sample_rate(),
                window = ANALYSIS_WINDOW,
                "analysis thread started"
            );
            let mut analyzer = Analyzer::new();
            while shared.state().is_running() {
                thread::sleep(CYCLE_PERIOD);
                // Re-check after waking so shutdown never waits a full cycle.
                if !shared.state().is_running() {
                    break;
                }
                analyzer.run_cycle(&shared);
            }
            tracing::info!("analysis thread stopped");
        }));
    }

    /// Signals the analysis thread to exit and waits for it.
    pub fn stop(&mut self) {
        self.shared.state.set_running(false);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("analysis thread panicked before shutdown");
            }
        }
    }
}

impl Drop for PitchEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
