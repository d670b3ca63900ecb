use poise::{CreateReply, serenity_prelude as serenity};
use ::serenity::all::{
    CreateEmbed, CreateEmbedFooter, CreateInteractionResponseFollowup, CreateMessage,
    EditInteractionResponse, EditMessage,
};
use std::time::Duration;
use thousands::Separable;

use super::button_controls::{self, ControlRows, QUEUE_PAGE_SIZE};
use super::time_format::{format_duration, progress_bar};
use crate::commands::music::engine::{PlayerSnapshot, RepeatMode, Track};

const BLURPLE: u32 = 0x5865f2;
const INFO_BLUE: u32 = 0x0099ff;

/// A message body independent of how it is delivered (channel message,
/// message edit, command reply or interaction response).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageView {
    pub content: Option<String>,
    pub embed: Option<EmbedView>,
    pub rows: ControlRows,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbedView {
    pub title: String,
    pub description: Option<String>,
    pub color: u32,
    pub thumbnail: Option<String>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedView {
    fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }
}

impl MessageView {
    /// A plain text message with no embed and no buttons.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// The same message with every button removed.
    pub fn without_controls(mut self) -> Self {
        self.rows.clear();
        self
    }

    fn embeds(&self) -> Vec<CreateEmbed> {
        self.embed.iter().map(CreateEmbed::from).collect()
    }

    pub fn to_create_message(&self) -> CreateMessage {
        let mut message = CreateMessage::new()
            .embeds(self.embeds())
            .components(button_controls::to_action_rows(&self.rows));
        if let Some(content) = &self.content {
            message = message.content(content.clone());
        }
        message
    }

    /// Edits replace every part of the message, so absent parts are cleared.
    pub fn to_edit_message(&self) -> EditMessage {
        EditMessage::new()
            .content(self.content.clone().unwrap_or_default())
            .embeds(self.embeds())
            .components(button_controls::to_action_rows(&self.rows))
    }

    pub fn to_reply(&self, ephemeral: bool) -> CreateReply {
        let mut reply = CreateReply::default()
            .components(button_controls::to_action_rows(&self.rows))
            .ephemeral(ephemeral);
        if let Some(content) = &self.content {
            reply = reply.content(content.clone());
        }
        if let Some(embed) = &self.embed {
            reply = reply.embed(CreateEmbed::from(embed));
        }
        reply
    }

    /// Fill in a deferred interaction response. Like message edits, this
    /// replaces every part.
    pub fn to_interaction_edit(&self) -> EditInteractionResponse {
        EditInteractionResponse::new()
            .content(self.content.clone().unwrap_or_default())
            .embeds(self.embeds())
            .components(button_controls::to_action_rows(&self.rows))
    }

    pub fn to_followup(&self, ephemeral: bool) -> CreateInteractionResponseFollowup {
        let mut followup = CreateInteractionResponseFollowup::new()
            .embeds(self.embeds())
            .components(button_controls::to_action_rows(&self.rows))
            .ephemeral(ephemeral);
        if let Some(content) = &self.content {
            followup = followup.content(content.clone());
        }
        followup
    }
}

impl From<&EmbedView> for CreateEmbed {
    fn from(view: &EmbedView) -> Self {
        let mut embed = CreateEmbed::new()
            .title(view.title.clone())
            .color(view.color)
            .timestamp(serenity::Timestamp::now());
        if let Some(description) = &view.description {
            embed = embed.description(description.clone());
        }
        if let Some(thumbnail) = &view.thumbnail {
            embed = embed.thumbnail(thumbnail.clone());
        }
        for field in &view.fields {
            embed = embed.field(field.name.clone(), field.value.clone(), field.inline);
        }
        if let Some(footer) = &view.footer {
            embed = embed.footer(CreateEmbedFooter::new(footer.clone()));
        }
        embed
    }
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

fn requester(track: &Track) -> String {
    track
        .requested_by
        .map(|user| format!("<@{}>", user))
        .unwrap_or_else(|| "Unknown".to_string())
}

/// The persistent "now playing" status message.
pub fn player_panel(snapshot: &PlayerSnapshot) -> MessageView {
    let track = &snapshot.track;
    let embed = EmbedView {
        title: "🎵 Now Playing".to_string(),
        description: Some(format!("**{}**", track.title)),
        color: BLURPLE,
        thumbnail: track.thumbnail.clone(),
        footer: Some(format!(
            "Queue: {} remaining",
            plural(snapshot.upcoming, "song")
        )),
        ..Default::default()
    }
    .field("👤 Artist", track.author.clone(), true)
    .field("⏱️ Duration", track.duration_label(), true)
    .field("📝 Requested by", requester(track), true);

    MessageView {
        content: None,
        embed: Some(embed),
        rows: button_controls::player_controls(snapshot),
    }
}

/// Clamp a requested page into `[0, total_pages - 1]`, where an empty queue
/// still has one page. Returns `(page, total_pages)`.
pub fn clamp_page(requested: usize, upcoming: usize) -> (usize, usize) {
    let total_pages = upcoming.div_ceil(QUEUE_PAGE_SIZE).max(1);
    (requested.min(total_pages - 1), total_pages)
}

/// The ephemeral, paginated queue browser.
pub fn queue_view(current: Option<&Track>, upcoming: &[Track], requested_page: usize) -> MessageView {
    let (page, total_pages) = clamp_page(requested_page, upcoming.len());

    let mut embed = EmbedView {
        title: "📋 Queue".to_string(),
        color: BLURPLE,
        ..Default::default()
    };

    if let Some(track) = current {
        embed = embed.field(
            "🎵 Now Playing",
            format!(
                "**{}**\n{} • {}",
                track.title,
                track.author,
                track.duration_label()
            ),
            false,
        );
    }

    if upcoming.is_empty() {
        embed = embed.field("⏭️ Up Next", "Queue is empty", false);
    } else {
        let start = page * QUEUE_PAGE_SIZE;
        let end = (start + QUEUE_PAGE_SIZE).min(upcoming.len());
        let listing = upcoming[start..end]
            .iter()
            .enumerate()
            .map(|(offset, track)| {
                format!(
                    "**{}.** {}\n{} • {}",
                    start + offset + 1,
                    track.title,
                    track.author,
                    track.duration_label()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        embed = embed.field(
            format!("⏭️ Up Next ({})", plural(upcoming.len(), "song")),
            listing,
            false,
        );
        if total_pages > 1 {
            embed.footer = Some(format!("Page {}/{}", page + 1, total_pages));
        }
    }

    MessageView {
        content: None,
        embed: Some(embed),
        rows: button_controls::queue_controls(page, total_pages, upcoming.len()),
    }
}

/// The multiple-choice prompt shown when a search is ambiguous.
pub fn selection_prompt(query: &str, candidates: &[Track]) -> MessageView {
    let mut embed = EmbedView {
        title: "🔍 Search Results".to_string(),
        description: Some(format!(
            "Found **{}** results for: *{}*\n\nPlease select a song:",
            candidates.len(),
            query
        )),
        color: BLURPLE,
        ..Default::default()
    };

    for (index, track) in candidates.iter().enumerate() {
        let views = track
            .views
            .map(|views| views.separate_with_commas())
            .unwrap_or_else(|| "?".to_string());
        embed = embed.field(
            format!("{}. {}", index + 1, track.title),
            format!(
                "👤 {}\n⏱️ {}\n👁️ {} views",
                track.author,
                track.duration_label(),
                views
            ),
            false,
        );
    }

    MessageView {
        content: None,
        embed: Some(embed),
        rows: button_controls::selection_controls(candidates.len()),
    }
}

/// The `/nowplaying` embed with a progress bar.
pub fn now_playing(
    track: &Track,
    position: Duration,
    volume: u8,
    repeat: RepeatMode,
) -> MessageView {
    let progress = match track.duration {
        Some(total) => format!(
            "{} {} {}",
            format_duration(position),
            progress_bar(position, total, 20),
            format_duration(total)
        ),
        None => format!("{} 🔴 Live", format_duration(position)),
    };

    let loop_status = match repeat {
        RepeatMode::Off => "Off",
        RepeatMode::Track => "🔂 Track",
        RepeatMode::Queue => "🔁 Queue",
        RepeatMode::Autoplay => "♾️ Autoplay",
    };

    let embed = EmbedView {
        title: "🎵 Now Playing".to_string(),
        description: Some(format!("**{}**", track.title)),
        color: INFO_BLUE,
        thumbnail: track.thumbnail.clone(),
        footer: track
            .requested_by
            .map(|_| format!("Requested by {}", requester(track))),
        ..Default::default()
    }
    .field("👤 Artist", track.author.clone(), true)
    .field("⏱️ Duration", track.duration_label(), true)
    .field("🔊 Volume", format!("{}%", volume), true)
    .field("⏳ Progress", progress, false)
    .field("🔁 Loop", loop_status, true);

    MessageView {
        content: None,
        embed: Some(embed),
        rows: Vec::new(),
    }
}
