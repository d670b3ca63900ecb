use super::*;
use engine::RepeatMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum LoopChoice {
    #[name = "Off"]
    Off,
    #[name = "Track"]
    Track,
    #[name = "Queue"]
    Queue,
    #[name = "Autoplay"]
    Autoplay,
}

impl From<LoopChoice> for RepeatMode {
    fn from(choice: LoopChoice) -> Self {
        match choice {
            LoopChoice::Off => RepeatMode::Off,
            LoopChoice::Track => RepeatMode::Track,
            LoopChoice::Queue => RepeatMode::Queue,
            LoopChoice::Autoplay => RepeatMode::Autoplay,
        }
    }
}

pub fn confirmation(mode: RepeatMode) -> &'static str {
    match mode {
        RepeatMode::Off => "🔁 Loop mode: **Off**",
        RepeatMode::Track => "🔂 Loop mode: **Track**",
        RepeatMode::Queue => "🔁 Loop mode: **Queue**",
        RepeatMode::Autoplay => "♾️ Loop mode: **Autoplay**",
    }
}

/// Set loop mode
#[poise::command(slash_command, guild_only, rename = "loop", category = "Music")]
pub async fn loop_mode(
    ctx: Context<'_>,
    #[description = "Loop mode"] mode: LoopChoice,
) -> CommandResult {
    let outcome = set_loop(ctx, mode.into()).await;
    MusicManager::respond(ctx, outcome).await
}

async fn set_loop(ctx: Context<'_>, mode: RepeatMode) -> MusicResult<String> {
    let queue = MusicManager::controllable_queue(ctx)?;
    queue.set_repeat_mode(mode).await;
    MusicManager::refresh_player(ctx, queue.guild_id()).await;
    Ok(confirmation(mode).to_string())
}
