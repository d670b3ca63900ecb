use super::*;
use engine::GuildQueue;
use std::sync::Arc;

/// Jump to a specific track in the queue
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn jump(
    ctx: Context<'_>,
    #[description = "Track position in queue (1 = next track)"]
    #[min = 1]
    position: u32,
) -> CommandResult {
    let position = position as usize;
    let queue = match queue_reaching(ctx, position).await {
        Ok(queue) => queue,
        Err(err) => return MusicManager::respond(ctx, Err(err)).await,
    };
    ctx.defer().await?;

    let outcome = queue
        .skip_to(position - 1)
        .await
        .map(|track| format!("⏭️ Jumped to **{}**!", track.title));
    MusicManager::respond_deferred(ctx, outcome).await
}

/// The guild's queue, provided it has a track at 1-based `position`.
async fn queue_reaching(ctx: Context<'_>, position: usize) -> MusicResult<Arc<dyn GuildQueue>> {
    let queue = MusicManager::controllable_queue(ctx)?;
    let upcoming = queue.upcoming_len().await;
    if position == 0 || position > upcoming {
        return Err(MusicError::InvalidPosition(upcoming));
    }
    Ok(queue)
}
