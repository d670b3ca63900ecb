use super::*;

/// Resume the paused track
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn resume(ctx: Context<'_>) -> CommandResult {
    let outcome = resume_track(ctx).await;
    MusicManager::respond(ctx, outcome).await
}

async fn resume_track(ctx: Context<'_>) -> MusicResult<String> {
    let queue = MusicManager::controllable_queue(ctx)?;
    if queue.current_track().await.is_none() {
        return Err(MusicError::NothingPlaying);
    }
    if !queue.is_paused().await {
        return Err(MusicError::NotPaused);
    }

    queue.resume().await?;
    MusicManager::refresh_player(ctx, queue.guild_id()).await;
    Ok("▶️ Music resumed!".to_string())
}
