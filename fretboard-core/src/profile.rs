use serde::{Deserialize, Serialize};

use crate::fretboard::Tuning;
use crate::state::{DEFAULT_HOLD_TIME_MS, DEFAULT_SENSITIVITY};

/// Front-end session settings: the stabilizer tunables plus the fingerboard
/// the resolver works against.
///
/// This is what the front-end saves to and loads from a JSON file. Missing
/// fields fall back to the defaults, so old profile files keep loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionProfile {
    /// Confidence threshold for note acceptance.
    pub sensitivity: f32,
    /// How long a note is held after the signal drops, in milliseconds.
    pub hold_time_ms: u32,
    /// Open-string notes, highest string first.
    pub tuning: Tuning,
    /// Highest playable fret.
    pub total_frets: i32,
    /// First fret of the preferred hand zone.
    pub preferred_position: i32,
    /// Width of the preferred zone in frets.
    pub finger_range: i32,
}

impl Default for SessionProfile {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            hold_time_ms: DEFAULT_HOLD_TIME_MS,
            tuning: Tuning::standard_guitar(),
            total_frets: 22,
            preferred_position: 0,
            finger_range: 5,
        }
    }
}
