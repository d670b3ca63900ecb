//! Pure helpers for rendering and parsing playback positions.

use std::time::Duration;

/// Format a duration as `M:SS`, or `H:MM:SS` once it reaches an hour.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Parse `MM:SS` or `HH:MM:SS`. Anything else, including a bare number of
/// seconds, is rejected.
pub fn parse_time_string(input: &str) -> Option<Duration> {
    let parts = input
        .trim()
        .split(':')
        .map(|part| {
            let part = part.trim();
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            part.parse::<u64>().ok()
        })
        .collect::<Option<Vec<u64>>>()?;

    let seconds = match parts.as_slice() {
        [minutes, seconds] => minutes.checked_mul(60)?.checked_add(*seconds)?,
        [hours, minutes, seconds] => hours
            .checked_mul(3600)?
            .checked_add(minutes.checked_mul(60)?)?
            .checked_add(*seconds)?,
        _ => return None,
    };

    Some(Duration::from_secs(seconds))
}

/// Render `position` out of `total` as a bar of `length` cells.
pub fn progress_bar(position: Duration, total: Duration, length: usize) -> String {
    let progress = if total.is_zero() {
        0.0
    } else {
        (position.as_secs_f64() / total.as_secs_f64()).min(1.0)
    };

    let filled = ((length as f64) * progress).round() as usize;
    let empty = length.saturating_sub(filled);

    format!("{}{}", "▓".repeat(filled), "░".repeat(empty))
}
