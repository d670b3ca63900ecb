use ::serenity::all::{
    ComponentInteraction, CreateInteractionResponse, CreateInteractionResponseMessage, GuildId,
    Http, MessageId, UserId,
};
use ::serenity::async_trait;
use poise::serenity_prelude::Context;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::button_controls::{ButtonAction, UnknownButton};
use super::embedded_messages::{self, MessageView};
use super::music_manager::{MusicError, MusicResult};
use super::selection::SelectionClick;
use crate::Data;
use crate::commands::music::engine::GuildQueue;

type ButtonInteractionResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

const NOTHING_PLAYING: &str = "❌ No music is currently playing!";
const UNKNOWN_ACTION: &str = "❌ Unknown button action";
const GENERIC_FAILURE: &str = "❌ An error occurred while processing your request";

/// The parts of a component interaction the router needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonClick {
    pub guild_id: Option<GuildId>,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub custom_id: String,
}

impl From<&ComponentInteraction> for ButtonClick {
    fn from(interaction: &ComponentInteraction) -> Self {
        Self {
            guild_id: interaction.guild_id,
            message_id: interaction.message.id,
            user_id: interaction.user.id,
            custom_id: interaction.data.custom_id.clone(),
        }
    }
}

/// How the router answers a click.
#[derive(Debug, Clone, PartialEq)]
pub enum ButtonReply {
    /// A reply only the clicking user can see.
    Ephemeral(MessageView),
    /// Replace the clicked message in place.
    Update(MessageView),
    /// Acknowledge with no visible output.
    Silent,
}

impl ButtonReply {
    fn ephemeral(text: impl Into<String>) -> Self {
        ButtonReply::Ephemeral(MessageView::text(text))
    }

    fn update(text: impl Into<String>) -> Self {
        ButtonReply::Update(MessageView::text(text))
    }
}

/// How a click is acknowledged before the router does any work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    /// Deferred update of the clicked message.
    InPlace,
    /// Deferred reply only the clicking user can see.
    Ephemeral,
}

/// Queue navigation and selection clicks change the message they sit on;
/// everything else answers privately.
pub fn acknowledgement(custom_id: &str) -> Acknowledgement {
    match custom_id.parse::<ButtonAction>() {
        Ok(
            ButtonAction::QueuePage(_)
            | ButtonAction::QueueRemove(_)
            | ButtonAction::QueueClearAll
            | ButtonAction::SongSelect(_)
            | ButtonAction::SongSelectCancel,
        ) => Acknowledgement::InPlace,
        _ => Acknowledgement::Ephemeral,
    }
}

/// The two halves of answering a component interaction.
#[async_trait]
pub trait ClickResponder: Send + Sync {
    async fn acknowledge(&self, ack: Acknowledgement) -> MusicResult<()>;
    async fn answer(&self, ack: Acknowledgement, reply: ButtonReply) -> MusicResult<()>;
}

/// Answers a live Discord interaction.
pub struct InteractionResponder<'a> {
    http: &'a Http,
    interaction: &'a ComponentInteraction,
}

impl<'a> InteractionResponder<'a> {
    pub fn new(http: &'a Http, interaction: &'a ComponentInteraction) -> Self {
        Self { http, interaction }
    }
}

#[async_trait]
impl<'a> ClickResponder for InteractionResponder<'a> {
    async fn acknowledge(&self, ack: Acknowledgement) -> MusicResult<()> {
        let response = match ack {
            Acknowledgement::InPlace => CreateInteractionResponse::Acknowledge,
            Acknowledgement::Ephemeral => CreateInteractionResponse::Defer(
                CreateInteractionResponseMessage::new().ephemeral(true),
            ),
        };
        self.interaction.create_response(self.http, response).await?;
        Ok(())
    }

    async fn answer(&self, ack: Acknowledgement, reply: ButtonReply) -> MusicResult<()> {
        match (ack, reply) {
            // The deferred response is the private reply, or the clicked
            // message itself after an in-place acknowledgement.
            (Acknowledgement::Ephemeral, ButtonReply::Ephemeral(view))
            | (_, ButtonReply::Update(view)) => {
                self.interaction
                    .edit_response(self.http, view.to_interaction_edit())
                    .await?;
            }
            (Acknowledgement::InPlace, ButtonReply::Ephemeral(view)) => {
                self.interaction
                    .create_followup(self.http, view.to_followup(true))
                    .await?;
            }
            (Acknowledgement::Ephemeral, ButtonReply::Silent) => {
                self.interaction.delete_response(self.http).await?;
            }
            (Acknowledgement::InPlace, ButtonReply::Silent) => {}
        }
        Ok(())
    }
}

/// Handle a button interaction end to end: acknowledge it, route it, then
/// answer it.
pub async fn handle_interaction(
    ctx: &Context,
    interaction: &ComponentInteraction,
    data: &Data,
) -> ButtonInteractionResult {
    let responder = InteractionResponder::new(&ctx.http, interaction);

    if let Err(err) = route_click(data, ButtonClick::from(interaction), &responder).await {
        warn!("Failed to answer button interaction: {}", err);
        interaction
            .create_followup(&ctx.http, MessageView::text(GENERIC_FAILURE).to_followup(true))
            .await?;
    }

    Ok(())
}

/// Acknowledge first, since engine work such as opening the next stream can
/// outlast Discord's response window, then dispatch and deliver the reply.
pub async fn route_click(
    data: &Data,
    click: ButtonClick,
    responder: &dyn ClickResponder,
) -> MusicResult<()> {
    let ack = acknowledgement(&click.custom_id);
    responder.acknowledge(ack).await?;
    let reply = dispatch(data, click).await;
    responder.answer(ack, reply).await
}

/// Decode a click and run it against the invoking guild's queue.
pub async fn dispatch(data: &Data, click: ButtonClick) -> ButtonReply {
    let action = match click.custom_id.parse::<ButtonAction>() {
        Ok(action) => action,
        Err(UnknownButton(id)) => {
            error!("Unknown button ID: {}", id);
            return ButtonReply::ephemeral(UNKNOWN_ACTION);
        }
    };

    // Selection prompts are keyed by message, not guild, and may be resolving
    // the guild's very first track. Foreign or late clicks stay silent.
    if action.is_selection() {
        let routed = data.selections.offer(
            click.message_id,
            SelectionClick {
                user_id: click.user_id,
                action,
            },
        );
        debug!("Selection click {} routed: {}", action, routed);
        return ButtonReply::Silent;
    }

    let Some(guild_id) = click.guild_id else {
        return ButtonReply::ephemeral(MusicError::NotInGuild.to_string());
    };
    let Some(queue) = data.engine.queue(guild_id) else {
        return ButtonReply::ephemeral(NOTHING_PLAYING);
    };

    info!("Button {} pressed in guild {}", action, guild_id);
    match run_action(data, guild_id, queue, action).await {
        Ok(reply) => reply,
        Err(err) => {
            error!("Button {} failed in guild {}: {}", action, guild_id, err);
            ButtonReply::ephemeral(GENERIC_FAILURE)
        }
    }
}

async fn run_action(
    data: &Data,
    guild_id: GuildId,
    queue: Arc<dyn GuildQueue>,
    action: ButtonAction,
) -> MusicResult<ButtonReply> {
    let reply = match action {
        ButtonAction::Pause => {
            let text = if queue.is_paused().await {
                queue.resume().await?;
                "▶️ Resumed playback"
            } else {
                queue.pause().await?;
                "⏸️ Paused playback"
            };
            refresh(data, guild_id).await;
            ButtonReply::ephemeral(text)
        }
        ButtonAction::Skip => {
            if queue.upcoming_len().await == 0 {
                ButtonReply::ephemeral("❌ No more songs in queue")
            } else {
                let skipped = queue.current_track().await.map(|track| track.title);
                queue.skip().await?;
                ButtonReply::ephemeral(format!(
                    "⏭️ Skipped: **{}**",
                    skipped.as_deref().unwrap_or("Unknown")
                ))
            }
        }
        ButtonAction::Stop => {
            queue.delete().await;
            data.player_messages.retire(guild_id).await;
            ButtonReply::ephemeral("⏹️ Stopped playback and cleared queue")
        }
        ButtonAction::Shuffle => {
            let shuffled = queue.shuffle().await;
            if shuffled == 0 {
                ButtonReply::ephemeral("❌ Queue is empty")
            } else {
                refresh(data, guild_id).await;
                ButtonReply::ephemeral(format!("🔀 Shuffled {} songs", shuffled))
            }
        }
        ButtonAction::Loop => {
            let mode = queue.repeat_mode().await.cycle();
            queue.set_repeat_mode(mode).await;
            refresh(data, guild_id).await;
            ButtonReply::ephemeral(format!("🔁 {}", mode.label()))
        }
        ButtonAction::ShowQueue => {
            let view = render_queue(queue.as_ref(), 0).await;
            ButtonReply::Ephemeral(view)
        }
        ButtonAction::QueuePage(page) => ButtonReply::Update(render_queue(queue.as_ref(), page).await),
        ButtonAction::QueueRemove(index) => match queue.remove(index).await {
            Some(track) => {
                refresh(data, guild_id).await;
                ButtonReply::update(format!("✅ Removed: **{}**", track.title))
            }
            None => ButtonReply::update("❌ Track not found in queue"),
        },
        ButtonAction::QueueClearAll => {
            queue.clear().await;
            refresh(data, guild_id).await;
            ButtonReply::update("🗑️ Queue cleared!")
        }
        ButtonAction::SongSelect(_) | ButtonAction::SongSelectCancel => ButtonReply::Silent,
    };

    Ok(reply)
}

async fn render_queue(queue: &dyn GuildQueue, page: usize) -> MessageView {
    let current = queue.current_track().await;
    let upcoming = queue.tracks().await;
    embedded_messages::queue_view(current.as_ref(), &upcoming, page)
}

/// Status message refreshes never fail the click that caused them.
async fn refresh(data: &Data, guild_id: GuildId) {
    if let Err(err) = data.player_messages.refresh(guild_id).await {
        warn!(
            "Failed to refresh status message for guild {}: {}",
            guild_id, err
        );
    }
}
