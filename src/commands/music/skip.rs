use super::*;
use engine::GuildQueue;
use std::sync::Arc;

/// Skip to the next song in the queue
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn skip(ctx: Context<'_>) -> CommandResult {
    let queue = match skippable_queue(ctx).await {
        Ok(queue) => queue,
        Err(err) => return MusicManager::respond(ctx, Err(err)).await,
    };
    // Opening the next stream can take a few seconds
    ctx.defer().await?;

    let outcome = queue
        .skip()
        .await
        .map(|()| "⏭️ Skipped to the next song!".to_string());
    MusicManager::respond_deferred(ctx, outcome).await
}

async fn skippable_queue(ctx: Context<'_>) -> MusicResult<Arc<dyn GuildQueue>> {
    let queue = MusicManager::controllable_queue(ctx)?;
    if queue.upcoming_len().await == 0 {
        return Err(MusicError::NoNextTrack);
    }
    Ok(queue)
}
