//! The playback engine contract. Commands, the button router and the status
//! message reconciler only ever talk to a guild's queue through these traits;
//! [`songbird_queue`] provides the implementation that drives real voice calls.

pub mod filters;
pub mod songbird_queue;

use poise::serenity_prelude::{ChannelId, GuildId, UserId};
use serenity::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::utils::music_manager::MusicError;
use super::utils::time_format::format_duration;

/// A playable track as resolved by one of the extractors.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub title: String,
    pub author: String,
    /// Page or media URL the extractor can stream from later.
    pub url: String,
    pub duration: Option<Duration>,
    pub views: Option<u64>,
    pub thumbnail: Option<String>,
    pub requested_by: Option<UserId>,
    /// Identifier of the extractor that produced this track.
    pub source: String,
}

impl Track {
    /// Duration as `M:SS`/`H:MM:SS`, or "Unknown" for live or unprobed media.
    pub fn duration_label(&self) -> String {
        self.duration
            .map(format_duration)
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    pub tracks: Vec<Track>,
    pub playlist: Option<Playlist>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// What happens when the current track finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RepeatMode {
    #[default]
    Off,
    Track,
    Queue,
    /// Keep playing related tracks once the queue runs dry.
    Autoplay,
}

impl RepeatMode {
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => RepeatMode::Track,
            2 => RepeatMode::Queue,
            3 => RepeatMode::Autoplay,
            _ => RepeatMode::Off,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            RepeatMode::Off => 0,
            RepeatMode::Track => 1,
            RepeatMode::Queue => 2,
            RepeatMode::Autoplay => 3,
        }
    }

    /// The loop button cycles Off -> Track -> Queue -> Off. Autoplay is only
    /// reachable explicitly and falls back to Off.
    pub fn cycle(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::Track,
            RepeatMode::Track => RepeatMode::Queue,
            RepeatMode::Queue | RepeatMode::Autoplay => RepeatMode::Off,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RepeatMode::Off => "Loop: Off",
            RepeatMode::Track => "Loop: Track",
            RepeatMode::Queue => "Loop: Queue",
            RepeatMode::Autoplay => "Loop: Autoplay",
        }
    }
}

/// Audio filters applied through ffmpeg when a stream URL is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFilter {
    BassBoost,
}

impl AudioFilter {
    pub fn name(self) -> &'static str {
        match self {
            AudioFilter::BassBoost => "bassboost",
        }
    }

    /// The ffmpeg `-af` expression for this filter.
    pub fn ffmpeg_expression(self) -> &'static str {
        match self {
            AudioFilter::BassBoost => "bass=g=15:f=110:w=0.3",
        }
    }
}

/// Where a guild's queue lives: the text channel its notices go to and the
/// voice channel it plays in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueMetadata {
    pub text_channel: ChannelId,
    pub voice_channel: ChannelId,
}

/// Everything the status message renders, captured at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub track: Track,
    pub paused: bool,
    pub repeat: RepeatMode,
    pub upcoming: usize,
}

impl PlayerSnapshot {
    /// Read the live queue state. `None` when nothing is loaded.
    pub async fn capture(queue: &dyn GuildQueue) -> Option<Self> {
        let track = queue.current_track().await?;
        Some(Self {
            track,
            paused: queue.is_paused().await,
            repeat: queue.repeat_mode().await,
            upcoming: queue.upcoming_len().await,
        })
    }
}

/// Resolves queries and owns the per-guild queues.
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    async fn search(&self, query: &str, requested_by: UserId) -> Result<SearchResult, MusicError>;

    /// The guild's live queue, if any.
    fn queue(&self, guild_id: GuildId) -> Option<Arc<dyn GuildQueue>>;

    /// Return the guild's queue, creating it with `metadata` if none exists.
    fn create_queue(&self, guild_id: GuildId, metadata: QueueMetadata) -> Arc<dyn GuildQueue>;
}

/// One guild's playback state and transport controls.
#[async_trait]
pub trait GuildQueue: Send + Sync {
    fn guild_id(&self) -> GuildId;
    fn metadata(&self) -> QueueMetadata;

    async fn is_connected(&self) -> bool;
    async fn connect(&self, voice_channel: ChannelId) -> Result<(), MusicError>;

    async fn current_track(&self) -> Option<Track>;
    /// Upcoming tracks in play order, not including the current one.
    async fn tracks(&self) -> Vec<Track>;
    async fn upcoming_len(&self) -> usize;
    async fn add_tracks(&self, tracks: Vec<Track>);

    /// Start playback if the queue is idle. No-op while a track is loaded.
    async fn play(&self) -> Result<(), MusicError>;
    /// A track is loaded and not paused.
    async fn is_playing(&self) -> bool;
    async fn is_paused(&self) -> bool;
    async fn pause(&self) -> Result<(), MusicError>;
    async fn resume(&self) -> Result<(), MusicError>;
    async fn skip(&self) -> Result<(), MusicError>;
    async fn seek(&self, position: Duration) -> Result<(), MusicError>;
    async fn timestamp(&self) -> Option<Duration>;

    async fn volume(&self) -> u8;
    async fn set_volume(&self, volume: u8) -> Result<(), MusicError>;

    /// Remove the upcoming track at `index`; `None` if it no longer exists.
    async fn remove(&self, index: usize) -> Option<Track>;
    /// Drop everything before `index` and play the track at `index` next.
    async fn skip_to(&self, index: usize) -> Result<Track, MusicError>;
    /// Shuffle the upcoming tracks, returning how many were shuffled.
    async fn shuffle(&self) -> usize;
    /// Empty the upcoming list without touching the current track.
    async fn clear(&self);

    async fn repeat_mode(&self) -> RepeatMode;
    async fn set_repeat_mode(&self, mode: RepeatMode);

    async fn previous_track(&self) -> Option<Track>;
    /// Play the most recent history entry, pushing the current track back.
    async fn back(&self) -> Result<(), MusicError>;

    async fn filters(&self) -> Vec<AudioFilter>;
    /// Toggle a filter, returning whether it is now enabled.
    async fn toggle_filter(&self, filter: AudioFilter) -> Result<bool, MusicError>;

    /// Number of non-bot listeners in the queue's voice channel changed.
    async fn listeners_changed(&self, _listeners: usize) {}

    /// Stop playback, leave voice, and discard the queue.
    async fn delete(&self);
}
