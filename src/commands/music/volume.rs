use super::*;

/// Set playback volume
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Volume level (0-100)"]
    #[min = 0]
    #[max = 100]
    amount: u8,
) -> CommandResult {
    let outcome = set_volume(ctx, amount).await;
    MusicManager::respond(ctx, outcome).await
}

async fn set_volume(ctx: Context<'_>, amount: u8) -> MusicResult<String> {
    let queue = MusicManager::controllable_queue(ctx)?;
    queue.set_volume(amount).await?;
    Ok(format!("🔊 Volume set to **{}%**!", amount))
}
