use poise::{CreateReply, serenity_prelude as serenity};
use serenity::model::id::{ChannelId, GuildId, UserId};
use serenity::{Permissions, VoiceState};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::embedded_messages::MessageView;
use super::selection::{PromptMessage, Resolution, SelectionPrompt};
use crate::commands::music::engine::{GuildQueue, PlaybackEngine, QueueMetadata, Track};
use crate::{CommandResult, Context, Data};

/// Errors that can occur during music operations. Precondition failures carry
/// the exact text shown to the invoking user.
#[derive(Error, Debug)]
pub enum MusicError {
    #[error("❌ This command can only be used in a server!")]
    NotInGuild,

    #[error("❌ You need to be in a voice channel!")]
    UserNotInVoiceChannel,

    #[error("❌ You need to be in the same voice channel as the bot!")]
    NotSameVoiceChannel,

    #[error("❌ I need permission to join and speak in your voice channel!")]
    MissingVoicePermissions,

    #[error("❌ There is no music playing!")]
    NoQueue,

    #[error("❌ There is no track currently playing!")]
    NothingPlaying,

    #[error("⏸️ The music is already paused!")]
    AlreadyPaused,

    #[error("▶️ The music is already playing!")]
    NotPaused,

    #[error("⏭️ No more songs in the queue!")]
    NoNextTrack,

    #[error("❌ There is no previous track!")]
    NoPreviousTrack,

    #[error("❌ There are no tracks in the queue to shuffle!")]
    QueueEmpty,

    #[error("❌ Invalid time format! Use MM:SS or HH:MM:SS")]
    InvalidTimeFormat,

    #[error("❌ Seek time exceeds track duration! Track length: {0}")]
    SeekBeyondTrack(String),

    #[error("❌ Invalid position! Queue has only {0} tracks.")]
    InvalidPosition(usize),

    #[error("❌ No results found! Make sure the URL is valid.")]
    NoResults,

    #[error("No candidates to choose from")]
    InvalidCandidates,

    #[error("Failed to get voice manager")]
    NoVoiceManager,

    #[error("Not connected to a voice channel")]
    NotConnected,

    #[error("Failed to join voice channel: {0}")]
    JoinError(String),

    #[error("Audio source error: {0}")]
    AudioSourceError(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Discord request failed: {0}")]
    Discord(#[from] ::serenity::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl MusicError {
    /// Precondition and race failures that are reported to the invoking user
    /// rather than treated as bot faults.
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            MusicError::InvalidCandidates
                | MusicError::NoVoiceManager
                | MusicError::NotConnected
                | MusicError::JoinError(_)
                | MusicError::AudioSourceError(_)
                | MusicError::Playback(_)
                | MusicError::Discord(_)
                | MusicError::ConfigError(_)
        )
    }
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

/// Voice-channel lookups and precondition checks shared by the music commands.
pub struct MusicManager;

impl MusicManager {
    pub fn guild_id(ctx: Context<'_>) -> MusicResult<GuildId> {
        ctx.guild_id().ok_or(MusicError::NotInGuild)
    }

    /// Get the voice channel ID that the user is currently in
    pub fn get_user_voice_channel(
        ctx: Context<'_>,
        guild_id: GuildId,
        user_id: UserId,
    ) -> MusicResult<ChannelId> {
        let guild = ctx
            .serenity_context()
            .cache
            .guild(guild_id)
            .ok_or(MusicError::NotInGuild)?;

        voice_channel_of(&guild.voice_states, user_id).ok_or(MusicError::UserNotInVoiceChannel)
    }

    /// Whether the bot may connect and speak in `channel_id`. Falls back to
    /// `true` when the cache cannot answer, letting the join itself fail.
    pub fn bot_can_speak_in(ctx: Context<'_>, guild_id: GuildId, channel_id: ChannelId) -> bool {
        let cache = &ctx.serenity_context().cache;
        let bot_id = cache.current_user().id;
        let Some(guild) = cache.guild(guild_id) else {
            return true;
        };
        let (Some(channel), Some(member)) =
            (guild.channels.get(&channel_id), guild.members.get(&bot_id))
        else {
            return true;
        };

        let permissions = guild.user_permissions_in(channel, member);
        permissions.contains(Permissions::CONNECT | Permissions::SPEAK)
    }

    /// Run the checks every transport command shares: caller in voice, an
    /// active queue, and caller in the queue's voice channel.
    pub fn controllable_queue(ctx: Context<'_>) -> MusicResult<Arc<dyn GuildQueue>> {
        let guild_id = Self::guild_id(ctx)?;
        let user_channel = Self::get_user_voice_channel(ctx, guild_id, ctx.author().id)?;
        let queue = ctx.data().engine.queue(guild_id).ok_or(MusicError::NoQueue)?;
        ensure_same_channel(user_channel, &queue.metadata())?;
        Ok(queue)
    }

    /// Caller in voice and an active queue, without the same-channel rule.
    /// Used by read-only views.
    pub fn visible_queue(ctx: Context<'_>) -> MusicResult<Arc<dyn GuildQueue>> {
        let guild_id = Self::guild_id(ctx)?;
        Self::get_user_voice_channel(ctx, guild_id, ctx.author().id)?;
        ctx.data().engine.queue(guild_id).ok_or(MusicError::NoQueue)
    }

    /// Bring the guild's status message in line with the queue. Failures are
    /// logged; the command itself already succeeded.
    pub async fn refresh_player(ctx: Context<'_>, guild_id: GuildId) {
        if let Err(err) = ctx.data().player_messages.refresh(guild_id).await {
            warn!(
                "Failed to refresh status message for guild {}: {}",
                guild_id, err
            );
        }
    }

    /// Reply with a confirmation, or with the failure when it is one the user
    /// should see. Anything else goes to the framework error handler.
    pub async fn respond(ctx: Context<'_>, outcome: MusicResult<String>) -> CommandResult {
        Self::deliver(ctx, reply_for(outcome, false)).await
    }

    /// Like [`MusicManager::respond`], for commands that already deferred
    /// publicly. The deferral fixed the reply's visibility, so failures are
    /// shown in the channel as well.
    pub async fn respond_deferred(ctx: Context<'_>, outcome: MusicResult<String>) -> CommandResult {
        Self::deliver(ctx, reply_for(outcome, true)).await
    }

    async fn deliver(ctx: Context<'_>, reply: MusicResult<CommandReply>) -> CommandResult {
        match reply? {
            CommandReply::Public(text) => {
                ctx.say(text).await?;
            }
            CommandReply::Private(text) => {
                debug!("Rejected /{}: {}", ctx.command().name, text);
                ctx.send(CreateReply::default().content(text).ephemeral(true))
                    .await?;
            }
        }
        Ok(())
    }
}

/// What a command answers with, and who gets to see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    Public(String),
    Private(String),
}

/// Confirmations are public. User-facing failures are private unless the
/// response was already deferred publicly. Internal failures stay errors.
pub fn reply_for(outcome: MusicResult<String>, deferred: bool) -> MusicResult<CommandReply> {
    match outcome {
        Ok(text) => Ok(CommandReply::Public(text)),
        Err(err) if err.is_user_facing() && deferred => Ok(CommandReply::Public(err.to_string())),
        Err(err) if err.is_user_facing() => Ok(CommandReply::Private(err.to_string())),
        Err(err) => Err(err),
    }
}

/// The voice channel `user_id` is connected to, according to `voice_states`.
pub fn voice_channel_of(
    voice_states: &HashMap<UserId, VoiceState>,
    user_id: UserId,
) -> Option<ChannelId> {
    voice_states.get(&user_id).and_then(|state| state.channel_id)
}

pub fn ensure_same_channel(user_channel: ChannelId, metadata: &QueueMetadata) -> MusicResult<()> {
    if user_channel == metadata.voice_channel {
        Ok(())
    } else {
        Err(MusicError::NotSameVoiceChannel)
    }
}

/// How an enqueue request landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// The queue was idle and playback started with these tracks.
    Started,
    /// Tracks were appended behind the current one.
    Queued,
}

/// Add tracks to the guild's queue, creating the queue and voice connection
/// if needed, and start playback when the queue was idle.
pub async fn enqueue(
    engine: &dyn PlaybackEngine,
    guild_id: GuildId,
    metadata: QueueMetadata,
    tracks: Vec<Track>,
) -> MusicResult<Enqueued> {
    let queue = engine.create_queue(guild_id, metadata);

    if !queue.is_connected().await {
        queue.connect(metadata.voice_channel).await?;
    }

    let idle = queue.current_track().await.is_none();
    let count = tracks.len();
    queue.add_tracks(tracks).await;
    info!("Enqueued {} track(s) for guild {}", count, guild_id);

    if !idle {
        return Ok(Enqueued::Queued);
    }
    queue.play().await?;
    // Streams that fail to open are reported by the player and skipped.
    if queue.current_track().await.is_none() {
        return Err(MusicError::Playback(format!(
            "no track could be started in guild {}",
            guild_id
        )));
    }
    Ok(Enqueued::Started)
}

/// Confirmation for a finished enqueue.
pub fn enqueue_confirmation(track: &Track, outcome: Enqueued) -> String {
    match outcome {
        Enqueued::Started => format!("🎶 Now playing: **{}**", track.title),
        Enqueued::Queued => format!("✅ Added to queue: **{}**", track.title),
    }
}

/// Wait for the requester to pick from `prompt`, queue the pick and turn the
/// prompt into the confirmation. The prompt can stay open for a while, so the
/// voice target comes from `join_target` once the pick arrives.
pub async fn enqueue_selection(
    data: &Data,
    guild_id: GuildId,
    message: PromptMessage,
    prompt: &SelectionPrompt,
    join_target: impl FnOnce() -> MusicResult<QueueMetadata>,
) -> Resolution {
    let resolution = data.selections.run(message, prompt).await;
    let Resolution::Selected(index) = resolution else {
        return resolution;
    };
    let Some(track) = prompt.candidate(index).cloned() else {
        return resolution;
    };
    debug!("Selected '{}' in guild {}", track.title, guild_id);

    let outcome = match join_target() {
        Ok(metadata) => enqueue(data.engine.as_ref(), guild_id, metadata, vec![track.clone()]).await,
        Err(err) => Err(err),
    };
    let notice = match outcome {
        Ok(outcome) => enqueue_confirmation(&track, outcome),
        Err(err) if err.is_user_facing() => err.to_string(),
        Err(err) => {
            error!("Failed to enqueue selected track in guild {}: {}", guild_id, err);
            format!("❌ Failed to play **{}**", track.title)
        }
    };
    data.selections
        .conclude(message, MessageView::text(notice))
        .await;
    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn metadata(voice: u64) -> QueueMetadata {
        QueueMetadata {
            text_channel: ChannelId::new(1),
            voice_channel: ChannelId::new(voice),
        }
    }

    #[test]
    fn test_same_channel_passes() {
        assert_matches!(ensure_same_channel(ChannelId::new(7), &metadata(7)), Ok(()));
    }

    #[test]
    fn test_other_channel_is_rejected() {
        assert_matches!(
            ensure_same_channel(ChannelId::new(8), &metadata(7)),
            Err(MusicError::NotSameVoiceChannel)
        );
    }

    #[test]
    fn test_voice_channel_of_unknown_user() {
        let states = HashMap::new();
        assert_eq!(voice_channel_of(&states, UserId::new(5)), None);
    }

    #[test]
    fn test_precondition_errors_are_user_facing() {
        assert!(MusicError::NoQueue.is_user_facing());
        assert!(MusicError::InvalidPosition(3).is_user_facing());
        assert!(!MusicError::Playback("boom".to_string()).is_user_facing());
    }

    #[test]
    fn test_rejections_are_private_until_deferred() {
        assert_eq!(
            reply_for(Err(MusicError::NoResults), false).unwrap(),
            CommandReply::Private("❌ No results found! Make sure the URL is valid.".to_string())
        );
        assert_eq!(
            reply_for(Err(MusicError::NoResults), true).unwrap(),
            CommandReply::Public("❌ No results found! Make sure the URL is valid.".to_string())
        );
    }

    #[test]
    fn test_confirmations_are_public_and_faults_propagate() {
        assert_eq!(
            reply_for(Ok("⏸️ Music paused!".to_string()), false).unwrap(),
            CommandReply::Public("⏸️ Music paused!".to_string())
        );
        assert_matches!(
            reply_for(Err(MusicError::Playback("boom".to_string())), true),
            Err(MusicError::Playback(_))
        );
    }

    #[test]
    fn test_enqueue_confirmation_texts() {
        let track = Track {
            title: "Song 1".to_string(),
            author: "Artist".to_string(),
            url: "https://www.youtube.com/watch?v=1".to_string(),
            duration: None,
            views: None,
            thumbnail: None,
            requested_by: None,
            source: "yt-dlp".to_string(),
        };
        assert_eq!(
            enqueue_confirmation(&track, Enqueued::Started),
            "🎶 Now playing: **Song 1**"
        );
        assert_eq!(
            enqueue_confirmation(&track, Enqueued::Queued),
            "✅ Added to queue: **Song 1**"
        );
    }

    #[test]
    fn test_invalid_position_message() {
        assert_eq!(
            MusicError::InvalidPosition(4).to_string(),
            "❌ Invalid position! Queue has only 4 tracks."
        );
    }
}
