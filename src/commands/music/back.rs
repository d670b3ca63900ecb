use super::*;
use engine::GuildQueue;
use std::sync::Arc;

/// Play the previous track again
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn back(ctx: Context<'_>) -> CommandResult {
    let queue = match queue_with_history(ctx).await {
        Ok(queue) => queue,
        Err(err) => return MusicManager::respond(ctx, Err(err)).await,
    };
    ctx.defer().await?;

    let outcome = queue
        .back()
        .await
        .map(|()| "⏮️ Playing previous track!".to_string());
    MusicManager::respond_deferred(ctx, outcome).await
}

async fn queue_with_history(ctx: Context<'_>) -> MusicResult<Arc<dyn GuildQueue>> {
    let queue = MusicManager::controllable_queue(ctx)?;
    if queue.previous_track().await.is_none() {
        return Err(MusicError::NoPreviousTrack);
    }
    Ok(queue)
}
