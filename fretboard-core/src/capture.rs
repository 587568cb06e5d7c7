//! # Audio Capture Module
//!
//! Microphone capture using CPAL (Cross-Platform Audio Library), feeding the
//! engine's lock-free ingest path straight from the stream callback.
//!
//! ## Features
//! - Automatic input device selection
//! - f32 config selection nearest the 44.1 kHz target rate
//! - Any channel count; frames are averaged to mono in the callback
//! - No allocation, locking, or channel sends on the callback

use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::Arc;

use crate::engine::EngineShared;

/// Preferred capture rate in Hz; the nearest supported rate is used.
pub const TARGET_SAMPLE_RATE: u32 = 44_100;

/// Picks the default input device and its best-matching f32 config.
///
/// Kept separate from [`start_capture`] so the session sample rate is known
/// before the engine is built around it.
///
/// # Returns
/// * `Ok((device, config))` - Input device and the config to open it with
/// * `Err(e)` - No device, or no f32 input format
pub fn open_default_input() -> Result<(cpal::Device, cpal::SupportedStreamConfig)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("no audio input device available"))?;

    tracing::info!(device = %device.name()?, "using audio input device");

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let range = find_supported_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("no suitable f32 input format found"))?;

    // Clamp into the range so with_sample_rate cannot reject the rate.
    let rate = TARGET_SAMPLE_RATE.clamp(range.min_sample_rate().0, range.max_sample_rate().0);
    let config = range.with_sample_rate(cpal::SampleRate(rate));

    tracing::info!(
        sample_rate = config.sample_rate().0,
        channels = config.channels(),
        "selected input config"
    );

    Ok((device, config))
}

/// Builds and starts the input stream.
///
/// The callback forwards every interleaved block to
/// [`EngineShared::ingest_interleaved`], which does the mono averaging and
/// ring write without blocking. The returned stream captures for as long as
/// it is kept alive; drop it to stop.
///
/// # Arguments
/// * `device` - Input device from [`open_default_input`]
/// * `config` - Stream config whose sample rate the engine was built with
/// * `shared` - The engine core to feed
pub fn start_capture(
    device: &cpal::Device,
    config: cpal::SupportedStreamConfig,
    shared: Arc<EngineShared>,
) -> Result<cpal::Stream> {
    if shared.sample_rate() != config.sample_rate().0 {
        return Err(anyhow!(
            "engine was built for {} Hz but the stream runs at {} Hz",
            shared.sample_rate(),
            config.sample_rate().0
        ));
    }

    let channels = config.channels();
    let config: cpal::StreamConfig = config.into();

    let err_fn = |err| tracing::error!("audio stream error: {}", err);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            shared.ingest_interleaved(data, channels);
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok(stream)
}

/// Finds the f32 input config whose supported rate range lies closest to the
/// target sample rate.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min_diff = (c.min_sample_rate().0 as i32 - target_rate as i32).abs();
            let max_diff = (c.max_sample_rate().0 as i32 - target_rate as i32).abs();
            min_diff.min(max_diff)
        })
}
