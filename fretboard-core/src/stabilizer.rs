//! Debouncing state machine that turns raw pitch estimates into a stable
//! displayed note.

use crate::note;
use crate::pitch::PitchEstimate;

/// Lower bound of the accepted instrument range in Hz, exclusive.
const MIN_VALID_HZ: f32 = 20.0;

/// Upper bound of the accepted instrument range in Hz, exclusive.
const MAX_VALID_HZ: f32 = 5000.0;

/// Confidence required to accept a jump of 11..=13 semitones from the last
/// valid note. Octave errors are the detector's most common failure, so
/// near-octave moves need stronger evidence.
const OCTAVE_CONFIDENCE: f32 = 0.85;

/// Confidence required to accept any other jump larger than a fifth.
const LEAP_CONFIDENCE: f32 = 0.75;

/// What the stabilizer wants shown this cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteReadout {
    /// Nearest MIDI note, `None` when nothing should be displayed.
    pub midi_note: Option<i32>,
    /// Pitch backing the displayed note in Hz, 0.0 when empty.
    pub pitch_hz: f32,
    /// Cents offset from the displayed note, 0.0 when empty.
    pub cents: f32,
}

impl NoteReadout {
    pub const EMPTY: NoteReadout = NoteReadout {
        midi_note: None,
        pitch_hz: 0.0,
        cents: 0.0,
    };
}

/// Coarse phase of the stabilizer, mostly useful for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing displayed: no note accepted yet, or the hold ran out.
    NoSignal,
    /// The displayed note was accepted this or a recent cycle.
    Active,
    /// The signal dropped; the last accepted note is being held.
    Holding,
}

/// Converts one raw [`PitchEstimate`] per analysis cycle into a stable note.
///
/// Acceptance requires the frequency to sit inside the instrument range and
/// the confidence to clear the caller's sensitivity threshold. Large
/// intervals from the last accepted note need extra confidence (octave
/// protection). When the signal drops, the last note keeps being displayed
/// for a caller-supplied number of hold frames before the display empties.
///
/// Two asymmetries callers rely on:
/// - Octave-protection rejections republish the held note without spending
///   hold frames; only range/confidence failures count against the hold.
/// - The last accepted note is remembered even after the hold expires, so a
///   suspicious octave jump right after a silent gap is still challenged.
#[derive(Debug)]
pub struct NoteStabilizer {
    last_valid_note: Option<i32>,
    last_valid_pitch: f32,
    last_valid_cents: f32,
    hold_counter: u32,
    displayed: NoteReadout,
    phase: Phase,
}

impl Default for NoteStabilizer {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteStabilizer {
    /// Starts in [`Phase::NoSignal`] with an empty display.
    pub fn new() -> Self {
        Self {
            last_valid_note: None,
            last_valid_pitch: 0.0,
            last_valid_cents: 0.0,
            hold_counter: 0,
            displayed: NoteReadout::EMPTY,
            phase: Phase::NoSignal,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The readout produced by the most recent [`step`](Self::step).
    pub fn displayed(&self) -> NoteReadout {
        self.displayed
    }

    /// Advances the machine by one analysis cycle and returns the readout to
    /// display. `hold_frames` is the hold time already converted to cycles.
    pub fn step(
        &mut self,
        estimate: PitchEstimate,
        sensitivity: f32,
        hold_frames: u32,
    ) -> NoteReadout {
        let PitchEstimate {
            frequency_hz,
            confidence,
        } = estimate;

        let usable = frequency_hz > MIN_VALID_HZ
            && frequency_hz < MAX_VALID_HZ
            && confidence > sensitivity;

        if usable {
            let (midi_note, cents) = note::frequency_to_midi(frequency_hz);

            let accept = match self.last_valid_note {
                Some(previous) => {
                    let interval = (midi_note - previous).abs();
                    if (11..=13).contains(&interval) {
                        confidence >= OCTAVE_CONFIDENCE
                    } else if interval > 7 {
                        confidence >= LEAP_CONFIDENCE
                    } else {
                        true
                    }
                }
                None => true,
            };

            if accept {
                self.last_valid_note = Some(midi_note);
                self.last_valid_pitch = frequency_hz;
                self.last_valid_cents = cents;
                self.hold_counter = hold_frames;
                self.displayed = NoteReadout {
                    midi_note: Some(midi_note),
                    pitch_hz: frequency_hz,
                    cents,
                };
                self.phase = Phase::Active;
            } else if self.hold_counter > 0 {
                // Octave protection fired: keep showing the held note and do
                // not touch the counter. With no hold left, the display stays
                // exactly as it is.
                self.displayed = self.held_readout();
            }
        } else {
            // No usable pitch this cycle; spend one hold frame if any remain.
            if self.hold_counter > 0 {
                self.hold_counter -= 1;
            }
            if self.hold_counter > 0 {
                self.displayed = self.held_readout();
                self.phase = Phase::Holding;
            } else {
                self.displayed = NoteReadout::EMPTY;
                self.phase = Phase::NoSignal;
            }
        }

        self.displayed
    }

    fn held_readout(&self) -> NoteReadout {
        NoteReadout {
            midi_note: self.last_valid_note,
            pitch_hz: self.last_valid_pitch,
            cents: self.last_valid_cents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::midi_to_frequency;

    const SENSITIVITY: f32 = 0.62;
    const HOLD: u32 = 20;

    fn est(frequency_hz: f32, confidence: f32) -> PitchEstimate {
        PitchEstimate {
            frequency_hz,
            confidence,
        }
    }

    fn silence() -> PitchEstimate {
        PitchEstimate::SILENCE
    }

    #[test]
    fn confident_pitch_is_accepted_and_displayed() {
        let mut stab = NoteStabilizer::new();
        let readout = stab.step(est(440.0, 0.95), SENSITIVITY, HOLD);
        assert_eq!(readout.midi_note, Some(69));
        assert_eq!(readout.pitch_hz, 440.0);
        assert!(readout.cents.abs() < 0.1);
        assert_eq!(stab.phase(), Phase::Active);
    }

    #[test]
    fn low_confidence_never_activates() {
        let mut stab = NoteStabilizer::new();
        let readout = stab.step(est(440.0, 0.3), SENSITIVITY, HOLD);
        assert_eq!(readout, NoteReadout::EMPTY);
        assert_eq!(stab.phase(), Phase::NoSignal);
    }

    #[test]
    fn out_of_range_frequencies_are_ignored() {
        let mut stab = NoteStabilizer::new();
        assert_eq!(stab.step(est(10.0, 0.99), SENSITIVITY, HOLD), NoteReadout::EMPTY);
        assert_eq!(stab.step(est(6000.0, 0.99), SENSITIVITY, HOLD), NoteReadout::EMPTY);
    }

    #[test]
    fn octave_jump_needs_high_confidence() {
        let mut stab = NoteStabilizer::new();
        stab.step(est(midi_to_frequency(60), 0.95), SENSITIVITY, HOLD);

        // An exact octave at 0.80 is rejected, the old note stays up.
        let readout = stab.step(est(midi_to_frequency(72), 0.80), SENSITIVITY, HOLD);
        assert_eq!(readout.midi_note, Some(60));

        // The same jump at 0.90 goes through.
        let readout = stab.step(est(midi_to_frequency(72), 0.90), SENSITIVITY, HOLD);
        assert_eq!(readout.midi_note, Some(72));
    }

    #[test]
    fn near_octave_intervals_are_protected_too() {
        for interval in [11, 13] {
            let mut stab = NoteStabilizer::new();
            stab.step(est(midi_to_frequency(50), 0.95), SENSITIVITY, HOLD);
            let readout =
                stab.step(est(midi_to_frequency(50 + interval), 0.80), SENSITIVITY, HOLD);
            assert_eq!(readout.midi_note, Some(50), "interval {interval}");
        }
    }

    #[test]
    fn wide_leap_needs_moderate_confidence() {
        let mut stab = NoteStabilizer::new();
        stab.step(est(midi_to_frequency(52), 0.95), SENSITIVITY, HOLD);

        let readout = stab.step(est(midi_to_frequency(60), 0.70), SENSITIVITY, HOLD);
        assert_eq!(readout.midi_note, Some(52), "8 semitones at 0.70 must hold");

        let readout = stab.step(est(midi_to_frequency(60), 0.76), SENSITIVITY, HOLD);
        assert_eq!(readout.midi_note, Some(60));
    }

    #[test]
    fn small_steps_pass_at_base_sensitivity() {
        let mut stab = NoteStabilizer::new();
        stab.step(est(midi_to_frequency(57), 0.95), SENSITIVITY, HOLD);
        let readout = stab.step(est(midi_to_frequency(59), 0.65), SENSITIVITY, HOLD);
        assert_eq!(readout.midi_note, Some(59));
    }

    #[test]
    fn held_note_survives_nineteen_silent_cycles_then_clears() {
        let mut stab = NoteStabilizer::new();
        stab.step(est(440.0, 0.95), SENSITIVITY, HOLD);

        for cycle in 1..HOLD {
            let readout = stab.step(silence(), SENSITIVITY, HOLD);
            assert_eq!(readout.midi_note, Some(69), "cycle {cycle}");
            assert_eq!(stab.phase(), Phase::Holding);
        }

        let readout = stab.step(silence(), SENSITIVITY, HOLD);
        assert_eq!(readout, NoteReadout::EMPTY);
        assert_eq!(stab.phase(), Phase::NoSignal);
    }

    #[test]
    fn zero_hold_clears_on_first_silent_cycle() {
        let mut stab = NoteStabilizer::new();
        stab.step(est(440.0, 0.95), SENSITIVITY, 0);
        let readout = stab.step(silence(), SENSITIVITY, 0);
        assert_eq!(readout, NoteReadout::EMPTY);
    }

    #[test]
    fn octave_rejections_do_not_spend_hold_frames() {
        let mut stab = NoteStabilizer::new();
        stab.step(est(midi_to_frequency(60), 0.95), SENSITIVITY, 2);

        // Five protection rejections in a row leave the counter untouched.
        for _ in 0..5 {
            let readout = stab.step(est(midi_to_frequency(72), 0.80), SENSITIVITY, 2);
            assert_eq!(readout.midi_note, Some(60));
        }

        // The two real hold frames are still available: one held cycle, then
        // the display clears.
        assert_eq!(
            stab.step(silence(), SENSITIVITY, 2).midi_note,
            Some(60)
        );
        assert_eq!(stab.step(silence(), SENSITIVITY, 2), NoteReadout::EMPTY);
    }

    #[test]
    fn reacceptance_restarts_the_hold() {
        let mut stab = NoteStabilizer::new();
        stab.step(est(440.0, 0.95), SENSITIVITY, 3);
        stab.step(silence(), SENSITIVITY, 3);
        stab.step(silence(), SENSITIVITY, 3);
        stab.step(est(440.0, 0.95), SENSITIVITY, 3);

        assert_eq!(stab.step(silence(), SENSITIVITY, 3).midi_note, Some(69));
        assert_eq!(stab.step(silence(), SENSITIVITY, 3).midi_note, Some(69));
        assert_eq!(stab.step(silence(), SENSITIVITY, 3), NoteReadout::EMPTY);
    }

    #[test]
    fn protection_outlives_an_expired_hold() {
        let mut stab = NoteStabilizer::new();
        stab.step(est(midi_to_frequency(60), 0.95), SENSITIVITY, 1);
        assert_eq!(stab.step(silence(), SENSITIVITY, 1), NoteReadout::EMPTY);

        // Display is empty, but the remembered note still challenges the
        // octave: 0.80 stays rejected and leaves the display empty.
        let readout = stab.step(est(midi_to_frequency(72), 0.80), SENSITIVITY, 1);
        assert_eq!(readout, NoteReadout::EMPTY);
        assert_eq!(stab.phase(), Phase::NoSignal);

        let readout = stab.step(est(midi_to_frequency(72), 0.90), SENSITIVITY, 1);
        assert_eq!(readout.midi_note, Some(72));
        assert_eq!(stab.phase(), Phase::Active);
    }
}
