use super::*;
use utils::embedded_messages;

/// Show the current queue
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn queue(ctx: Context<'_>) -> CommandResult {
    let queue = match MusicManager::visible_queue(ctx) {
        Ok(queue) => queue,
        Err(err) => return MusicManager::respond(ctx, Err(err)).await,
    };

    let current = queue.current_track().await;
    let upcoming = queue.tracks().await;
    let view = embedded_messages::queue_view(current.as_ref(), &upcoming, 0);
    ctx.send(view.to_reply(true)).await?;
    Ok(())
}
