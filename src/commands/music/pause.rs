use super::*;

/// Pause the current track
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn pause(ctx: Context<'_>) -> CommandResult {
    let outcome = pause_track(ctx).await;
    MusicManager::respond(ctx, outcome).await
}

async fn pause_track(ctx: Context<'_>) -> MusicResult<String> {
    let queue = MusicManager::controllable_queue(ctx)?;
    if queue.current_track().await.is_none() {
        return Err(MusicError::NothingPlaying);
    }
    if queue.is_paused().await {
        return Err(MusicError::AlreadyPaused);
    }

    queue.pause().await?;
    MusicManager::refresh_player(ctx, queue.guild_id()).await;
    Ok("⏸️ Music paused!".to_string())
}
