//! # Fretboard Module
//!
//! Instrument tunings and the string/fret position search. Given a detected
//! note, the resolver picks the most playable position relative to where the
//! hand already is, preferring a caller-configured fret zone.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

/// Registry of common tunings by name, highest-pitched string first.
static NAMED_TUNINGS: Lazy<BTreeMap<&'static str, Vec<i32>>> = Lazy::new(|| {
    BTreeMap::from([
        ("standard", vec![64, 59, 55, 50, 45, 40]),
        ("drop-d", vec![64, 59, 55, 50, 45, 38]),
        ("seven-string", vec![64, 59, 55, 50, 45, 40, 35]),
        ("eight-string", vec![64, 59, 55, 50, 45, 40, 35, 30]),
        ("bass", vec![43, 38, 33, 28]),
    ])
});

/// Open-string MIDI notes of a fretted instrument, index 0 = highest string.
///
/// Fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tuning {
    strings: Vec<i32>,
}

impl Tuning {
    pub fn new(strings: Vec<i32>) -> Self {
        Self { strings }
    }

    /// Standard six-string guitar, E4 down to E2.
    pub fn standard_guitar() -> Self {
        Self::by_name("standard").expect("standard tuning is registered")
    }

    /// Looks a tuning up by registry name (`"standard"`, `"drop-d"`, ...).
    pub fn by_name(name: &str) -> Option<Self> {
        NAMED_TUNINGS.get(name).map(|strings| Self {
            strings: strings.clone(),
        })
    }

    /// Registered tuning names, alphabetical.
    pub fn names() -> Vec<&'static str> {
        NAMED_TUNINGS.keys().copied().collect()
    }

    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    /// Open-string notes, index 0 = highest string.
    pub fn strings(&self) -> &[i32] {
        &self.strings
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Self::standard_guitar()
    }
}

/// A playable location for a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FretPosition {
    /// String index into the tuning, 0 = highest string.
    pub string_index: usize,
    /// Fret number, 0 = open string.
    pub fret: i32,
    /// The note this position sounds.
    pub midi_note: i32,
}

/// Chooses string/fret positions for detected notes, biased toward keeping
/// the hand where it already is.
///
/// The remembered hand position starts at string 0, fret 0 and moves to each
/// successfully resolved position, so consecutive resolutions favor small
/// movements.
#[derive(Debug)]
pub struct PositionResolver {
    current_string: usize,
    current_fret: i32,
}

impl Default for PositionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionResolver {
    pub fn new() -> Self {
        Self {
            current_string: 0,
            current_fret: 0,
        }
    }

    /// The remembered hand position as `(string_index, fret)`.
    pub fn current_position(&self) -> (usize, i32) {
        (self.current_string, self.current_fret)
    }

    /// Finds the best position for one note, or `None` when the note is not
    /// playable anywhere on the fingerboard.
    ///
    /// Candidates inside the preferred zone (`preferred_position` up to
    /// `preferred_position + finger_range - 1`, inclusive) beat every
    /// candidate outside it regardless of distance. Within the same zone
    /// status, the smallest Manhattan distance from the current hand position
    /// wins; equal distances go to the lowest string index. A successful
    /// resolution moves the remembered hand position.
    pub fn resolve(
        &mut self,
        target_midi_note: i32,
        tuning: &Tuning,
        preferred_position: i32,
        finger_range: i32,
        total_frets: i32,
    ) -> Option<FretPosition> {
        let chosen = self.best_candidate(
            target_midi_note,
            tuning,
            preferred_position,
            finger_range,
            total_frets,
        );
        if let Some(position) = chosen {
            self.current_string = position.string_index;
            self.current_fret = position.fret;
        }
        chosen
    }

    /// Resolves several simultaneously active notes.
    ///
    /// The result is parallel to `target_midi_notes`. Every note is measured
    /// against the hand position left by the first note that resolves; only
    /// that first success moves the remembered position. Callers must supply
    /// the notes in a deterministic order (ascending MIDI, as
    /// [`ActiveNotes::snapshot`] produces) for reproducible layouts.
    pub fn resolve_all(
        &mut self,
        target_midi_notes: &[i32],
        tuning: &Tuning,
        preferred_position: i32,
        finger_range: i32,
        total_frets: i32,
    ) -> Vec<Option<FretPosition>> {
        let mut anchor_moved = false;
        target_midi_notes
            .iter()
            .map(|&target| {
                let chosen = self.best_candidate(
                    target,
                    tuning,
                    preferred_position,
                    finger_range,
                    total_frets,
                );
                if let Some(position) = chosen {
                    if !anchor_moved {
                        self.current_string = position.string_index;
                        self.current_fret = position.fret;
                        anchor_moved = true;
                    }
                }
                chosen
            })
            .collect()
    }

    fn best_candidate(
        &self,
        target_midi_note: i32,
        tuning: &Tuning,
        preferred_position: i32,
        finger_range: i32,
        total_frets: i32,
    ) -> Option<FretPosition> {
        let mut best: Option<(FretPosition, i32, bool)> = None;

        for (string_index, &open_note) in tuning.strings().iter().enumerate() {
            let fret = target_midi_note - open_note;
            if fret < 0 || fret > total_frets {
                continue;
            }

            let distance = (string_index as i32 - self.current_string as i32).abs()
                + (fret - self.current_fret).abs();
            let in_zone =
                fret >= preferred_position && fret < preferred_position + finger_range;

            let better = match &best {
                None => true,
                Some((_, best_distance, best_in_zone)) => {
                    if in_zone != *best_in_zone {
                        // Zone membership outranks distance.
                        in_zone
                    } else {
                        // Strict comparison keeps the lowest string on ties.
                        distance < *best_distance
                    }
                }
            };

            if better {
                best = Some((
                    FretPosition {
                        string_index,
                        fret,
                        midi_note: target_midi_note,
                    },
                    distance,
                    in_zone,
                ));
            }
        }

        best.map(|(position, _, _)| position)
    }
}

/// The set of currently sounding notes, fed by the front-end and drained by
/// the resolver's caller.
///
/// This is the only lock in the crate. It is never touched by the audio
/// callback or the analysis thread; snapshots come out in ascending MIDI
/// order, which is exactly the deterministic order [`PositionResolver::resolve_all`]
/// asks for.
#[derive(Debug, Default)]
pub struct ActiveNotes {
    notes: Mutex<BTreeSet<i32>>,
}

impl ActiveNotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a note; returns false if it was already active.
    pub fn insert(&self, midi_note: i32) -> bool {
        self.lock().insert(midi_note)
    }

    /// Removes a note; returns false if it was not active.
    pub fn remove(&self, midi_note: i32) -> bool {
        self.lock().remove(&midi_note)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Currently active notes in ascending MIDI order.
    pub fn snapshot(&self) -> Vec<i32> {
        self.lock().iter().copied().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<i32>> {
        // The critical sections are tiny and cannot panic, so a poisoned
        // lock still holds consistent data.
        self.notes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
