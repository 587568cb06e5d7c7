//! Cross-thread scalar state shared between the analysis thread and its observers.
//!
//! Everything here is a plain atomic. The analysis thread is the sole writer of
//! the detection and diagnostic fields; the front-end is the sole writer of the
//! tunables. Each scalar is independent (last-writer-wins), so relaxed ordering
//! is sufficient and no locks appear anywhere on either path.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

/// Atomic float wrapper for real-time audio thread safety.
#[derive(Debug)]
pub struct AtomicF32 {
    storage: AtomicU32,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            storage: AtomicU32::new(value.to_bits()),
        }
    }

    pub fn load(&self, ordering: Ordering) -> f32 {
        f32::from_bits(self.storage.load(ordering))
    }

    pub fn store(&self, value: f32, ordering: Ordering) {
        self.storage.store(value.to_bits(), ordering);
    }
}

/// Sentinel stored in the displayed-note field when no note is being shown.
pub const NO_NOTE: i32 = -1;

/// Default confidence threshold for note acceptance.
pub const DEFAULT_SENSITIVITY: f32 = 0.62;

/// Default hold time in milliseconds.
pub const DEFAULT_HOLD_TIME_MS: u32 = 400;

/// Upper end of the useful sensitivity range. 0.0 accepts almost anything,
/// values past this reject nearly everything.
pub const MAX_SENSITIVITY: f32 = 0.95;

/// Upper end of the hold-time range in milliseconds.
pub const MAX_HOLD_TIME_MS: u32 = 10_000;

/// Detection results, diagnostics, and user tunables, all atomically readable.
///
/// The detection fields (`displayed_*`, `signal_level`) and the diagnostics
/// are refreshed once per analysis cycle. The tunables take effect on the
/// next cycle after being set.
#[derive(Debug)]
pub struct PublishedState {
    displayed_pitch_hz: AtomicF32,
    displayed_cents: AtomicF32,
    displayed_midi_note: AtomicI32,
    signal_level: AtomicF32,

    // Diagnostics, published every cycle whether or not a note is accepted
    raw_pitch_hz: AtomicF32,
    raw_confidence: AtomicF32,
    raw_rms: AtomicF32,

    sensitivity: AtomicF32,
    hold_time_ms: AtomicU32,

    running: AtomicBool,
}

/// Snapshot of the per-cycle diagnostic values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnostics {
    /// Raw estimate straight out of the detector, before stabilization.
    pub raw_pitch_hz: f32,
    /// Detector confidence for that estimate (1 is certain).
    pub raw_confidence: f32,
    /// RMS level of the most recent input block.
    pub raw_rms: f32,
}

impl Default for PublishedState {
    fn default() -> Self {
        Self {
            displayed_pitch_hz: AtomicF32::new(0.0),
            displayed_cents: AtomicF32::new(0.0),
            displayed_midi_note: AtomicI32::new(NO_NOTE),
            signal_level: AtomicF32::new(0.0),
            raw_pitch_hz: AtomicF32::new(0.0),
            raw_confidence: AtomicF32::new(0.0),
            raw_rms: AtomicF32::new(0.0),
            sensitivity: AtomicF32::new(DEFAULT_SENSITIVITY),
            hold_time_ms: AtomicU32::new(DEFAULT_HOLD_TIME_MS),
            running: AtomicBool::new(false),
        }
    }
}

impl PublishedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the displayed note for observers. Analysis thread only.
    pub(crate) fn publish_display(&self, pitch_hz: f32, cents: f32, midi_note: i32) {
        self.displayed_pitch_hz.store(pitch_hz, Ordering::Relaxed);
        self.displayed_cents.store(cents, Ordering::Relaxed);
        self.displayed_midi_note.store(midi_note, Ordering::Relaxed);
    }

    pub(crate) fn publish_level(&self, rms: f32) {
        self.signal_level.store(rms, Ordering::Relaxed);
    }

    pub(crate) fn publish_diagnostics(&self, raw_pitch_hz: f32, raw_confidence: f32, raw_rms: f32) {
        self.raw_pitch_hz.store(raw_pitch_hz, Ordering::Relaxed);
        self.raw_confidence.store(raw_confidence, Ordering::Relaxed);
        self.raw_rms.store(raw_rms, Ordering::Relaxed);
    }

    /// Pitch of the displayed note in Hz, 0.0 when nothing is shown.
    pub fn displayed_pitch_hz(&self) -> f32 {
        self.displayed_pitch_hz.load(Ordering::Relaxed)
    }

    /// Cents offset of the displayed note from its nearest equal-tempered pitch.
    pub fn displayed_cents(&self) -> f32 {
        self.displayed_cents.load(Ordering::Relaxed)
    }

    /// Displayed MIDI note, or [`NO_NOTE`] when nothing is shown.
    pub fn displayed_midi_note(&self) -> i32 {
        self.displayed_midi_note.load(Ordering::Relaxed)
    }

    /// Instantaneous input level (RMS of the most recent audio block).
    pub fn signal_level(&self) -> f32 {
        self.signal_level.load(Ordering::Relaxed)
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            raw_pitch_hz: self.raw_pitch_hz.load(Ordering::Relaxed),
            raw_confidence: self.raw_confidence.load(Ordering::Relaxed),
            raw_rms: self.raw_rms.load(Ordering::Relaxed),
        }
    }

    /// Confidence threshold a raw estimate must exceed to be accepted.
    pub fn sensitivity(&self) -> f32 {
        self.sensitivity.load(Ordering::Relaxed)
    }

    /// Sets the confidence threshold, clamped to `0.0..=MAX_SENSITIVITY`.
    pub fn set_sensitivity(&self, threshold: f32) {
        self.sensitivity
            .store(threshold.clamp(0.0, MAX_SENSITIVITY), Ordering::Relaxed);
    }

    /// How long the last accepted note keeps being displayed after the signal drops.
    pub fn hold_time_ms(&self) -> u32 {
        self.hold_time_ms.load(Ordering::Relaxed)
    }

    /// Sets the hold time, clamped to `0..=MAX_HOLD_TIME_MS`.
    pub fn set_hold_time_ms(&self, ms: u32) {
        self.hold_time_ms
            .store(ms.min(MAX_HOLD_TIME_MS), Ordering::Relaxed);
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Relaxed);
    }

    /// True while the analysis thread should keep cycling.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}
