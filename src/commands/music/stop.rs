use super::*;

/// Stop playback, clear the queue and leave the voice channel
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn stop(ctx: Context<'_>) -> CommandResult {
    let outcome = stop_playback(ctx).await;
    MusicManager::respond(ctx, outcome).await
}

async fn stop_playback(ctx: Context<'_>) -> MusicResult<String> {
    let queue = MusicManager::controllable_queue(ctx)?;
    let guild_id = queue.guild_id();

    queue.delete().await;
    ctx.data().player_messages.retire(guild_id).await;
    info!("Stopped playback in guild {}", guild_id);
    Ok("⏹️ Stopped playback and cleared the queue!".to_string())
}
