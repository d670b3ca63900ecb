use super::*;
use engine::AudioFilter;

/// Toggle the bassboost filter
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn bassboost(ctx: Context<'_>) -> CommandResult {
    let queue = match MusicManager::controllable_queue(ctx) {
        Ok(queue) => queue,
        Err(err) => return MusicManager::respond(ctx, Err(err)).await,
    };

    // Re-opening the stream with the new filter graph takes a moment.
    ctx.defer().await?;
    let outcome = queue
        .toggle_filter(AudioFilter::BassBoost)
        .await
        .map(|enabled| {
            format!(
                "🎚️ Bassboost **{}**!",
                if enabled { "enabled" } else { "disabled" }
            )
        });
    MusicManager::respond_deferred(ctx, outcome).await
}
