//! # Pitch Detection Module
//!
//! This module implements fundamental-frequency estimation using the YIN
//! algorithm (de Cheveigne & Kawahara, 2002), a time-domain method built on a
//! cumulative-mean-normalized difference function.
//!
//! ## Features
//! - Absolute-threshold search with local-minimum refinement
//! - Global-minimum fallback when no dip clears the threshold
//! - Parabolic interpolation for sub-sample lag accuracy
//! - Well-defined sentinel output for silent or aperiodic input

/// Normalized-difference value a lag must dip below to be taken as a period
/// candidate on the first pass.
const TOLERANCE: f32 = 0.50;

/// Lower edge of the searched frequency range in Hz.
const MIN_FREQUENCY_HZ: f32 = 30.0;

/// Upper edge of the searched frequency range in Hz.
const MAX_FREQUENCY_HZ: f32 = 2000.0;

/// Result of analyzing one window of samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    /// Estimated fundamental frequency in Hz, 0.0 when nothing was detected.
    pub frequency_hz: f32,
    /// How periodic the window was at the chosen lag, 1.0 = perfectly.
    pub confidence: f32,
}

impl PitchEstimate {
    /// Sentinel for silent, aperiodic, or degenerate input.
    pub const SILENCE: PitchEstimate = PitchEstimate {
        frequency_hz: 0.0,
        confidence: 0.0,
    };
}

/// Estimates the fundamental frequency of one window of mono samples.
///
/// Deterministic and free of shared state: calling it twice on the same
/// window yields bit-identical results. The search covers lags corresponding
/// to roughly 30 Hz..2000 Hz, further bounded by half the window length.
///
/// # Arguments
/// * `window` - Mono samples to analyze, typically a few thousand
/// * `sample_rate` - Sample rate of the window in Hz
///
/// # Returns
/// * A [`PitchEstimate`]; [`PitchEstimate::SILENCE`] when no period was found
pub fn estimate(window: &[f32], sample_rate: u32) -> PitchEstimate {
    let half = window.len() / 2;
    if half < 2 {
        return PitchEstimate::SILENCE;
    }

    let mut diff = vec![0.0f32; half];

    // --- Step 1: squared difference function over every candidate lag ---
    for tau in 1..half {
        let mut sum = 0.0;
        for j in 0..half {
            let delta = window[j] - window[j + tau];
            sum += delta * delta;
        }
        diff[tau] = sum;
    }

    // --- Step 2: cumulative mean normalized difference ---
    // diff[0] is 1.0 by definition; a zero running sum (all-silent window)
    // normalizes to 1.0 as well, which no search below will accept.
    let mut running_sum = 0.0;
    diff[0] = 1.0;
    for tau in 1..half {
        running_sum += diff[tau];
        if running_sum != 0.0 {
            diff[tau] *= tau as f32 / running_sum;
        } else {
            diff[tau] = 1.0;
        }
    }

    // --- Step 3: absolute threshold with local-minimum walk ---
    // Lag bounds follow the searched frequency range; lags below 2 alias and
    // lags at the buffer edge break interpolation.
    let mut min_tau = (sample_rate as f32 / MAX_FREQUENCY_HZ) as usize;
    let mut max_tau = (sample_rate as f32 / MIN_FREQUENCY_HZ) as usize;
    if min_tau < 2 {
        min_tau = 2;
    }
    if max_tau > half - 1 {
        max_tau = half - 1;
    }

    let mut tau_estimate = 0;
    let mut min_value = 1.0f32;

    let mut tau = min_tau;
    while tau < max_tau {
        if diff[tau] < TOLERANCE {
            // Below tolerance: keep walking while the dip still deepens.
            while tau + 1 < max_tau && diff[tau + 1] < diff[tau] {
                tau += 1;
            }
            tau_estimate = tau;
            min_value = diff[tau];
            break;
        }
        tau += 1;
    }

    // --- Step 4: fall back to the global minimum over the search range ---
    if tau_estimate == 0 {
        for tau in min_tau..max_tau {
            if diff[tau] < min_value {
                min_value = diff[tau];
                tau_estimate = tau;
            }
        }
    }

    if tau_estimate == 0 {
        return PitchEstimate::SILENCE;
    }

    let confidence = 1.0 - min_value;

    // --- Step 5: parabolic interpolation for sub-sample lag accuracy ---
    let refined_tau = if tau_estimate > 1 && tau_estimate < half - 1 {
        let s0 = diff[tau_estimate - 1];
        let s1 = diff[tau_estimate];
        let s2 = diff[tau_estimate + 1];

        let denom = 2.0 * (2.0 * s1 - s2 - s0);
        if denom.abs() > 1e-9 {
            tau_estimate as f32 + (s0 - s2) / denom
        } else {
            tau_estimate as f32
        }
    } else {
        tau_estimate as f32
    };

    if refined_tau <= 0.0 {
        return PitchEstimate::SILENCE;
    }

    PitchEstimate {
        frequency_hz: sample_rate as f32 / refined_tau,
        confidence,
    }
}
