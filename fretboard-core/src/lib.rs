// fretboard-core/src/lib.rs

//! The core logic for the fretboard note tracker.
//! This crate is responsible for audio capture, pitch detection, note
//! stabilization, and fretboard position resolution. It is completely
//! headless and contains no GUI code.
//!
//! The live pipeline: the audio callback feeds [`ring_buffer`] through
//! [`engine::EngineShared::ingest_interleaved`]; the background thread in
//! [`engine`] runs [`pitch::estimate`] on a window snapshot every cycle and
//! pushes the result through [`stabilizer`]; observers read the outcome from
//! [`state::PublishedState`] and hand displayed notes to
//! [`fretboard::PositionResolver`].

pub mod capture;
pub mod engine;
pub mod fretboard;
pub mod note;
pub mod pitch;
pub mod profile;
pub mod ring_buffer;
pub mod stabilizer;
pub mod state;
