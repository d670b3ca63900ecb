use ::serenity::all::ClientBuilder;
use dotenv::dotenv;
use poise::{CreateReply, serenity_prelude as serenity};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use encore::commands::music::audio_sources::Extractors;
use encore::commands::music::engine::songbird_queue::{EngineSettings, SongbirdEngine};
use encore::commands::music::engine::PlaybackEngine;
use encore::commands::music::utils::{
    event_handlers::EventBridge, messenger::DiscordMessenger, messenger::Messenger,
    player_messages::PlayerMessages, selection::SelectionSessions,
};
use encore::commands::{general, music};
use encore::config::Config;
use encore::{Data, Error, events};

const GENERIC_FAILURE: &str = "❌ An error occurred while processing your request";

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command /{}: {}", ctx.command().name, error);
            let reply = CreateReply::default().content(GENERIC_FAILURE).ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                warn!("Failed to report command error: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling framework error: {}", e);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("encore=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let config = Arc::new(Config::from_env()?);

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let mut commands = general::commands();
    commands.extend(music::commands());

    // Playback lives outside the framework so songbird can be registered on
    // the client and lifecycle events can flow to the bridge.
    let manager = Songbird::serenity();
    let http = reqwest::Client::new();
    let extractors = Arc::new(Extractors::with_defaults(&config.ytdlp_path, http.clone()));
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let engine: Arc<dyn PlaybackEngine> = Arc::new(SongbirdEngine::new(
        Arc::clone(&manager),
        extractors,
        http,
        EngineSettings::from(config.as_ref()),
        events_tx,
    ));

    let token = config.discord_token.clone();
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            on_error: |error| Box::pin(on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(events::event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                match config.guild_id {
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            guild_id,
                        )
                        .await?;
                        info!("Registered commands in guild {}", guild_id);
                    }
                    None => {
                        poise::builtins::register_globally(ctx, &framework.options().commands)
                            .await?;
                        info!("Registered commands globally");
                    }
                }

                let messenger: Arc<dyn Messenger> =
                    Arc::new(DiscordMessenger::new(Arc::clone(&ctx.http)));
                let player_messages =
                    Arc::new(PlayerMessages::new(Arc::clone(&engine), Arc::clone(&messenger)));
                let selections = Arc::new(SelectionSessions::new(Arc::clone(&messenger)));

                let bridge = EventBridge::new(
                    Arc::clone(&engine),
                    Arc::clone(&player_messages),
                    messenger,
                );
                tokio::spawn(bridge.run(events_rx));

                info!("{} is connected!", ready.user.name);
                Ok(Data {
                    config,
                    engine,
                    player_messages,
                    selections,
                })
            })
        });

    let mut client = ClientBuilder::new(token, intents)
        .framework(framework.build())
        .register_songbird_with(manager)
        .await?;

    client.start().await.map_err(Into::into)
}
