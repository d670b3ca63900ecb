use super::*;
use engine::GuildQueue;
use std::sync::Arc;
use std::time::Duration;
use utils::time_format::{format_duration, parse_time_string};

/// Seek to a specific time in the current track
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn seek(
    ctx: Context<'_>,
    #[description = "Time to seek to (format: MM:SS or HH:MM:SS)"] time: String,
) -> CommandResult {
    let (queue, position) = match seek_target(ctx, &time).await {
        Ok(target) => target,
        Err(err) => return MusicManager::respond(ctx, Err(err)).await,
    };
    // With filters on, seeking restarts ffmpeg on a freshly opened stream
    ctx.defer().await?;

    let outcome = queue
        .seek(position)
        .await
        .map(|()| format!("⏩ Seeked to **{}**!", format_duration(position)));
    MusicManager::respond_deferred(ctx, outcome).await
}

async fn seek_target(
    ctx: Context<'_>,
    time: &str,
) -> MusicResult<(Arc<dyn GuildQueue>, Duration)> {
    let queue = MusicManager::controllable_queue(ctx)?;
    let position = parse_time_string(time).ok_or(MusicError::InvalidTimeFormat)?;
    let track = queue
        .current_track()
        .await
        .ok_or(MusicError::NothingPlaying)?;
    if let Some(length) = track.duration {
        if position > length {
            return Err(MusicError::SeekBeyondTrack(format_duration(length)));
        }
    }
    Ok((queue, position))
}
