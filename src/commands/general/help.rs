use super::*;

/// Show help for all commands or a specific one
#[poise::command(slash_command, category = "General")]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> CommandResult {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            extra_text_at_bottom: "Join a voice channel and use /play to get started.",
            ephemeral: true,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| e.into())
}
