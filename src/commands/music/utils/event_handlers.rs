//! Turns engine lifecycle events into channel notices and status message
//! updates. The engine only ever emits [`PlayerEvent`]s; what users see is
//! decided here.

use ::serenity::all::{ChannelId, GuildId};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

use super::embedded_messages::MessageView;
use super::messenger::Messenger;
use super::player_messages::PlayerMessages;
use crate::commands::music::engine::{PlaybackEngine, PlayerSnapshot, Track};

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEventKind {
    PlayerStart(Track),
    AudioTrackAdd(Track),
    Disconnect,
    EmptyChannel,
    EmptyQueue,
    Error(String),
    PlayerError(String),
    Debug(String),
}

/// An engine event, tagged with the guild it belongs to and the text channel
/// the queue was created from.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerEvent {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub kind: PlayerEventKind,
}

pub struct EventBridge {
    engine: Arc<dyn PlaybackEngine>,
    player_messages: Arc<PlayerMessages>,
    messenger: Arc<dyn Messenger>,
}

impl EventBridge {
    pub fn new(
        engine: Arc<dyn PlaybackEngine>,
        player_messages: Arc<PlayerMessages>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            engine,
            player_messages,
            messenger,
        }
    }

    /// Drain engine events until every sender is gone.
    pub async fn run(self, mut events: UnboundedReceiver<PlayerEvent>) {
        info!("Player event bridge started");
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
        info!("Player event bridge stopped");
    }

    pub async fn handle(&self, event: PlayerEvent) {
        let PlayerEvent {
            guild_id,
            channel_id,
            kind,
        } = event;

        match kind {
            PlayerEventKind::PlayerStart(track) => {
                info!("Started playing '{}' in guild {}", track.title, guild_id);
                self.on_player_start(guild_id, channel_id, track).await;
            }
            PlayerEventKind::AudioTrackAdd(track) => {
                let playing = match self.engine.queue(guild_id) {
                    Some(queue) => queue.is_playing().await,
                    None => false,
                };
                if playing {
                    // The status message's queue count covers this case.
                    if let Err(err) = self.player_messages.refresh(guild_id).await {
                        warn!("Failed to refresh status message for guild {}: {}", guild_id, err);
                    }
                } else {
                    self.notify(
                        guild_id,
                        channel_id,
                        format!("➕ Added to queue: **{}**", track.title),
                    )
                    .await;
                }
            }
            PlayerEventKind::Disconnect => {
                self.player_messages.retire(guild_id).await;
                self.notify(guild_id, channel_id, "👋 Disconnected from voice channel!")
                    .await;
            }
            PlayerEventKind::EmptyChannel => {
                self.notify(
                    guild_id,
                    channel_id,
                    "🚪 Leaving voice channel due to inactivity...",
                )
                .await;
            }
            PlayerEventKind::EmptyQueue => {
                self.notify(guild_id, channel_id, "✅ Queue finished!").await;
            }
            PlayerEventKind::Error(message) => {
                error!("Queue error in guild {}: {}", guild_id, message);
                self.notify(guild_id, channel_id, format!("❌ Queue error: {}", message))
                    .await;
            }
            PlayerEventKind::PlayerError(message) => {
                error!("Player error in guild {}: {}", guild_id, message);
                self.notify(
                    guild_id,
                    channel_id,
                    format!("❌ Error playing track: {}", message),
                )
                .await;
            }
            PlayerEventKind::Debug(message) => {
                debug!("[guild {}] {}", guild_id, message);
            }
        }
    }

    async fn on_player_start(&self, guild_id: GuildId, channel_id: ChannelId, track: Track) {
        let snapshot = match self.engine.queue(guild_id) {
            Some(queue) => PlayerSnapshot::capture(queue.as_ref()).await,
            None => None,
        };
        let Some(snapshot) = snapshot else {
            debug!(
                "Queue for guild {} went away before its status message could be posted",
                guild_id
            );
            return;
        };

        if let Err(err) = self
            .player_messages
            .publish(guild_id, channel_id, &snapshot)
            .await
        {
            warn!(
                "Failed to publish status message for guild {}, falling back to plain text: {}",
                guild_id, err
            );
            self.notify(
                guild_id,
                channel_id,
                format!("▶️ Now playing: **{}**", track.title),
            )
            .await;
        }
    }

    /// Post a one-off notice. A failure is logged and never reaches the engine.
    async fn notify(&self, guild_id: GuildId, channel_id: ChannelId, text: impl Into<String>) {
        if let Err(err) = self
            .messenger
            .send(channel_id, MessageView::text(text))
            .await
        {
            warn!("Failed to send notice to guild {}: {}", guild_id, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::music::engine::{GuildQueue, QueueMetadata, SearchResult};
    use crate::commands::music::utils::messenger::MockMessenger;
    use crate::commands::music::utils::music_manager::MusicError;
    use ::serenity::all::{MessageId, UserId};
    use std::time::Duration;

    struct NoQueues;

    #[serenity::async_trait]
    impl PlaybackEngine for NoQueues {
        async fn search(&self, _query: &str, _requested_by: UserId) -> Result<SearchResult, MusicError> {
            Ok(SearchResult::default())
        }

        fn queue(&self, _guild_id: GuildId) -> Option<Arc<dyn GuildQueue>> {
            None
        }

        fn create_queue(&self, _guild_id: GuildId, _metadata: QueueMetadata) -> Arc<dyn GuildQueue> {
            unreachable!("the bridge never creates queues")
        }
    }

    fn track() -> Track {
        Track {
            title: "Song".to_string(),
            author: "Band".to_string(),
            url: "https://www.youtube.com/watch?v=song".to_string(),
            duration: Some(Duration::from_secs(200)),
            views: None,
            thumbnail: None,
            requested_by: None,
            source: "yt-dlp".to_string(),
        }
    }

    fn bridge(messenger: MockMessenger) -> EventBridge {
        let engine: Arc<dyn PlaybackEngine> = Arc::new(NoQueues);
        let messenger: Arc<dyn Messenger> = Arc::new(messenger);
        let player_messages = Arc::new(PlayerMessages::new(
            Arc::clone(&engine),
            Arc::clone(&messenger),
        ));
        EventBridge::new(engine, player_messages, messenger)
    }

    fn event(kind: PlayerEventKind) -> PlayerEvent {
        PlayerEvent {
            guild_id: GuildId::new(1),
            channel_id: ChannelId::new(2),
            kind,
        }
    }

    fn expect_notice(messenger: &mut MockMessenger, text: &'static str) {
        messenger
            .expect_send()
            .withf(move |channel, view| {
                *channel == ChannelId::new(2) && view.content.as_deref() == Some(text)
            })
            .times(1)
            .returning(|_, _| Ok(MessageId::new(9)));
    }

    #[tokio::test]
    async fn test_track_added_while_idle_is_announced() {
        let mut messenger = MockMessenger::new();
        expect_notice(&mut messenger, "➕ Added to queue: **Song**");

        bridge(messenger)
            .handle(event(PlayerEventKind::AudioTrackAdd(track())))
            .await;
    }

    #[tokio::test]
    async fn test_queue_finished_notice() {
        let mut messenger = MockMessenger::new();
        expect_notice(&mut messenger, "✅ Queue finished!");

        bridge(messenger)
            .handle(event(PlayerEventKind::EmptyQueue))
            .await;
    }

    #[tokio::test]
    async fn test_player_error_notice_includes_message() {
        let mut messenger = MockMessenger::new();
        expect_notice(&mut messenger, "❌ Error playing track: 403 Forbidden");

        bridge(messenger)
            .handle(event(PlayerEventKind::PlayerError("403 Forbidden".to_string())))
            .await;
    }

    #[tokio::test]
    async fn test_debug_events_are_not_posted() {
        let mut messenger = MockMessenger::new();
        messenger.expect_send().never();

        bridge(messenger)
            .handle(event(PlayerEventKind::Debug("voice ready".to_string())))
            .await;
    }

    /// With the queue already gone there is nothing to render.
    #[tokio::test]
    async fn test_player_start_without_queue_posts_nothing() {
        let mut messenger = MockMessenger::new();
        messenger.expect_send().never();
        messenger.expect_edit().never();

        bridge(messenger)
            .handle(event(PlayerEventKind::PlayerStart(track())))
            .await;
    }

    #[tokio::test]
    async fn test_notice_failure_is_swallowed() {
        let mut messenger = MockMessenger::new();
        messenger.expect_send().times(1).returning(|_, _| {
            Err(MusicError::Playback("channel gone".to_string()))
        });

        bridge(messenger)
            .handle(event(PlayerEventKind::EmptyChannel))
            .await;
    }
}
