//! Filtered playback: when a queue has audio filters enabled, its direct media
//! URL is piped through ffmpeg and read back as raw 48kHz stereo floats.

use songbird::input::{ChildContainer, Input, RawAdapter};
use symphonia::core::io::ReadOnlySource;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::debug;

use super::AudioFilter;
use crate::commands::music::utils::music_manager::MusicError;

const SAMPLE_RATE: u32 = 48_000;
const CHANNELS: u32 = 2;

/// The `-af` filter graph for `filters`, or `None` when there is nothing to apply.
pub fn filter_chain(filters: &[AudioFilter]) -> Option<String> {
    if filters.is_empty() {
        return None;
    }
    Some(
        filters
            .iter()
            .map(|filter| filter.ffmpeg_expression())
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// Arguments for decoding `url` from `start` with `chain` applied.
pub fn ffmpeg_args(url: &str, chain: Option<&str>, start: Duration) -> Vec<String> {
    let mut args: Vec<String> = [
        "-reconnect",
        "1",
        "-reconnect_streamed",
        "1",
        "-reconnect_delay_max",
        "5",
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect();

    if !start.is_zero() {
        args.push("-ss".to_string());
        args.push(format!("{:.3}", start.as_secs_f64()));
    }
    args.push("-i".to_string());
    args.push(url.to_string());
    if let Some(chain) = chain {
        args.push("-af".to_string());
        args.push(chain.to_string());
    }
    args.extend([
        "-f".to_string(),
        "f32le".to_string(),
        "-ar".to_string(),
        SAMPLE_RATE.to_string(),
        "-ac".to_string(),
        CHANNELS.to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "pipe:1".to_string(),
    ]);
    args
}

/// Spawn ffmpeg for `url` and wrap its stdout as a songbird input.
pub fn spawn_filtered(
    ffmpeg_path: &str,
    url: &str,
    filters: &[AudioFilter],
    start: Duration,
) -> Result<Input, MusicError> {
    let chain = filter_chain(filters);
    let args = ffmpeg_args(url, chain.as_deref(), start);
    debug!("Spawning {} with filters {:?}", ffmpeg_path, chain);

    let child = Command::new(ffmpeg_path)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| MusicError::AudioSourceError(format!("Failed to start ffmpeg: {}", e)))?;

    Ok(RawAdapter::new(
        ReadOnlySource::new(ChildContainer::from(child)),
        SAMPLE_RATE,
        CHANNELS,
    ).into())
}
