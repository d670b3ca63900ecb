use super::*;

/// Shuffle the upcoming tracks
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn shuffle(ctx: Context<'_>) -> CommandResult {
    let outcome = shuffle_queue(ctx).await;
    MusicManager::respond(ctx, outcome).await
}

async fn shuffle_queue(ctx: Context<'_>) -> MusicResult<String> {
    let queue = MusicManager::controllable_queue(ctx)?;
    if queue.upcoming_len().await == 0 {
        return Err(MusicError::QueueEmpty);
    }

    let shuffled = queue.shuffle().await;
    MusicManager::refresh_player(ctx, queue.guild_id()).await;
    Ok(format!("🔀 Shuffled **{}** tracks!", shuffled))
}
