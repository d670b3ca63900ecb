use super::*;
use utils::embedded_messages;

/// Show the currently playing song
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn nowplaying(ctx: Context<'_>) -> CommandResult {
    let guild_id = match MusicManager::guild_id(ctx) {
        Ok(guild_id) => guild_id,
        Err(err) => return MusicManager::respond(ctx, Err(err)).await,
    };
    let Some(queue) = ctx.data().engine.queue(guild_id) else {
        return MusicManager::respond(ctx, Err(MusicError::NoQueue)).await;
    };
    let Some(track) = queue.current_track().await else {
        return MusicManager::respond(ctx, Err(MusicError::NothingPlaying)).await;
    };

    let position = queue.timestamp().await.unwrap_or_default();
    let view = embedded_messages::now_playing(
        &track,
        position,
        queue.volume().await,
        queue.repeat_mode().await,
    );
    ctx.send(view.to_reply(false)).await?;
    Ok(())
}
