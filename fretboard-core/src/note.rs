//! # Note Conversion Module
//!
//! Conversions between frequency, MIDI note number, and display name, based
//! on equal temperament with A4 = 440 Hz. These are used by the stabilizer to
//! turn accepted frequencies into notes and by front-ends to label them.

/// Note names within an octave, C-based to match MIDI numbering.
const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Converts a frequency to the nearest MIDI note and the remaining offset.
///
/// The fractional note number is `69 + 12 * log2(f / 440)`; it is rounded to
/// the nearest integer note and the remainder is expressed in cents
/// (hundredths of a semitone, positive = sharp).
///
/// # Arguments
/// * `frequency_hz` - Input frequency in Hz, must be positive
///
/// # Returns
/// * `(midi_note, cents_offset)` - Nearest note and deviation from it
pub fn frequency_to_midi(frequency_hz: f32) -> (i32, f32) {
    let midi_float = 69.0 + 12.0 * (frequency_hz / 440.0).log2();
    let midi_note = midi_float.round() as i32;
    let cents = (midi_float - midi_note as f32) * 100.0;
    (midi_note, cents)
}

/// Equal-tempered frequency of a MIDI note (A4 = 69 = 440 Hz).
pub fn midi_to_frequency(midi_note: i32) -> f32 {
    440.0 * 2.0_f32.powf((midi_note - 69) as f32 / 12.0)
}

/// Display name of a MIDI note in scientific pitch notation (60 = "C4").
///
/// Negative note numbers are the "no note" sentinel and render as `"-"`.
pub fn midi_note_name(midi_note: i32) -> String {
    if midi_note < 0 {
        return "-".to_string();
    }
    let octave = (midi_note / 12) - 1;
    format!("{}{}", NOTE_NAMES[midi_note as usize % 12], octave)
}
