//! End-to-end pipeline checks: ingest, analysis cycle, published state, and
//! position resolution, driven synchronously except for one live-thread test.

use std::time::Duration;

use fretboard_core::engine::{Analyzer, EngineShared, PitchEngine, RING_BUFFER_SIZE};
use fretboard_core::fretboard::{ActiveNotes, FretPosition, PositionResolver, Tuning};
use fretboard_core::note::midi_to_frequency;
use fretboard_core::state::NO_NOTE;

const SAMPLE_RATE: u32 = 44_100;

fn sine(frequency: f64, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * frequency * i as f64 / SAMPLE_RATE as f64;
            (0.5 * phase.sin()) as f32
        })
        .collect()
}

fn fill_with_tone(shared: &EngineShared, midi_note: i32) {
    shared.ingest(&sine(midi_to_frequency(midi_note) as f64, RING_BUFFER_SIZE));
}

fn fill_with_silence(shared: &EngineShared) {
    shared.ingest(&vec![0.0; RING_BUFFER_SIZE]);
}

#[test]
fn tone_flows_from_ingest_to_fret_position() {
    let shared = EngineShared::new(SAMPLE_RATE);
    let mut analyzer = Analyzer::new();

    fill_with_tone(&shared, 64);
    analyzer.run_cycle(&shared);

    assert_eq!(shared.state().displayed_midi_note(), 64);
    assert!(shared.state().signal_level() > 0.3);

    let mut resolver = PositionResolver::new();
    let tuning = Tuning::standard_guitar();
    let position = resolver.resolve(shared.state().displayed_midi_note(), &tuning, 0, 5, 22);
    assert_eq!(
        position,
        Some(FretPosition {
            string_index: 0,
            fret: 0,
            midi_note: 64
        })
    );
}

#[test]
fn active_note_set_feeds_resolve_all_in_ascending_order() {
    let notes = ActiveNotes::new();
    notes.insert(67);
    notes.insert(64);

    let mut resolver = PositionResolver::new();
    let tuning = Tuning::standard_guitar();
    let positions = resolver.resolve_all(&notes.snapshot(), &tuning, 0, 5, 22);

    // The snapshot is ascending, so 64 anchors the hand and 67 is then
    // measured from that anchor.
    assert_eq!(
        positions,
        vec![
            Some(FretPosition {
                string_index: 0,
                fret: 0,
                midi_note: 64
            }),
            Some(FretPosition {
                string_index: 0,
                fret: 3,
                midi_note: 67
            }),
        ]
    );
    assert_eq!(resolver.current_position(), (0, 0));
}

#[test]
fn stereo_and_mono_ingest_detect_the_same_note() {
    let mono = EngineShared::new(SAMPLE_RATE);
    let stereo = EngineShared::new(SAMPLE_RATE);

    let samples = sine(midi_to_frequency(57) as f64, RING_BUFFER_SIZE);
    mono.ingest(&samples);
    let interleaved: Vec<f32> = samples.iter().flat_map(|&s| [s, s]).collect();
    stereo.ingest_interleaved(&interleaved, 2);

    let mut mono_analyzer = Analyzer::new();
    mono_analyzer.run_cycle(&mono);
    let mut stereo_analyzer = Analyzer::new();
    stereo_analyzer.run_cycle(&stereo);

    assert_eq!(mono.state().displayed_midi_note(), 57);
    assert_eq!(stereo.state().displayed_midi_note(), 57);
}

#[test]
fn held_note_survives_the_configured_hold_then_clears() {
    let shared = EngineShared::new(SAMPLE_RATE);
    let mut analyzer = Analyzer::new();
    shared.state().set_hold_time_ms(400); // 20 cycles at 50 Hz

    fill_with_tone(&shared, 69);
    analyzer.run_cycle(&shared);
    assert_eq!(shared.state().displayed_midi_note(), 69);
    let held_pitch = shared.state().displayed_pitch_hz();

    fill_with_silence(&shared);
    for cycle in 1..20 {
        analyzer.run_cycle(&shared);
        assert_eq!(
            shared.state().displayed_midi_note(),
            69,
            "hold broke at cycle {cycle}"
        );
        assert_eq!(shared.state().displayed_pitch_hz(), held_pitch);
    }

    analyzer.run_cycle(&shared);
    assert_eq!(shared.state().displayed_midi_note(), NO_NOTE);
    assert_eq!(shared.state().displayed_pitch_hz(), 0.0);
}

#[test]
fn hold_tunable_takes_effect_on_the_next_cycle() {
    let shared = EngineShared::new(SAMPLE_RATE);
    let mut analyzer = Analyzer::new();

    // With no hold at all, one silent cycle clears the display.
    shared.state().set_hold_time_ms(0);
    fill_with_tone(&shared, 69);
    analyzer.run_cycle(&shared);
    fill_with_silence(&shared);
    analyzer.run_cycle(&shared);
    assert_eq!(shared.state().displayed_midi_note(), NO_NOTE);

    // Raising the hold afterwards protects the next acceptance.
    shared.state().set_hold_time_ms(400);
    fill_with_tone(&shared, 69);
    analyzer.run_cycle(&shared);
    fill_with_silence(&shared);
    analyzer.run_cycle(&shared);
    assert_eq!(shared.state().displayed_midi_note(), 69);
}

#[test]
fn diagnostics_update_even_while_the_display_holds() {
    let shared = EngineShared::new(SAMPLE_RATE);
    let mut analyzer = Analyzer::new();
    shared.state().set_hold_time_ms(400);

    fill_with_tone(&shared, 69);
    analyzer.run_cycle(&shared);
    assert!(shared.state().diagnostics().raw_confidence > 0.9);

    fill_with_silence(&shared);
    analyzer.run_cycle(&shared);

    // Display still holds the note, but the raw values went quiet.
    assert_eq!(shared.state().displayed_midi_note(), 69);
    let diagnostics = shared.state().diagnostics();
    assert_eq!(diagnostics.raw_pitch_hz, 0.0);
    assert_eq!(diagnostics.raw_confidence, 0.0);
}

#[test]
fn live_engine_detects_and_survives_shutdown() {
    let mut engine = PitchEngine::new(SAMPLE_RATE);
    let shared = engine.shared();

    fill_with_tone(&shared, 69);
    engine.start();

    // Give the 50 Hz thread a few cycles to pick the tone up.
    std::thread::sleep(Duration::from_millis(120));
    assert_eq!(shared.state().displayed_midi_note(), 69);

    engine.stop();
    assert!(!shared.state().is_running());

    // State stays readable after shutdown.
    assert_eq!(shared.state().displayed_midi_note(), 69);
}
