//! In-memory stand-ins for the playback engine and Discord messaging.

use dashmap::DashMap;
use encore::commands::music::engine::{
    AudioFilter, GuildQueue, PlaybackEngine, QueueMetadata, RepeatMode, SearchResult, Track,
};
use encore::commands::music::utils::component_handlers::{
    Acknowledgement, ButtonReply, ClickResponder,
};
use encore::commands::music::utils::embedded_messages::MessageView;
use encore::commands::music::utils::messenger::{EditOutcome, Messenger};
use encore::commands::music::utils::music_manager::MusicError;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, UserId};
use serenity::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

type Registry = DashMap<GuildId, Arc<FakeQueue>>;

/// Engine whose queues are plain lists. Search returns whatever was staged.
#[derive(Default)]
pub struct FakeEngine {
    queues: Arc<Registry>,
    pub search_result: Mutex<SearchResult>,
}

impl FakeEngine {
    /// Create a queue already playing `current` with `upcoming` behind it.
    pub fn playing(&self, guild_id: GuildId, current: Track, upcoming: Vec<Track>) -> Arc<FakeQueue> {
        let queue = self.fake_queue(guild_id, super::fixtures::metadata());
        {
            let mut state = queue.state.lock().unwrap();
            state.current = Some(current);
            state.upcoming = upcoming;
        }
        queue
    }

    pub fn fake_queue(&self, guild_id: GuildId, metadata: QueueMetadata) -> Arc<FakeQueue> {
        let registry = Arc::downgrade(&self.queues);
        Arc::clone(
            self.queues
                .entry(guild_id)
                .or_insert_with(|| {
                    Arc::new(FakeQueue {
                        guild_id,
                        metadata,
                        registry,
                        state: Mutex::new(FakeState {
                            volume: 50,
                            ..Default::default()
                        }),
                    })
                })
                .value(),
        )
    }
}

#[async_trait]
impl PlaybackEngine for FakeEngine {
    async fn search(&self, _query: &str, _requested_by: UserId) -> Result<SearchResult, MusicError> {
        Ok(self.search_result.lock().unwrap().clone())
    }

    fn queue(&self, guild_id: GuildId) -> Option<Arc<dyn GuildQueue>> {
        self.queues
            .get(&guild_id)
            .map(|entry| Arc::clone(entry.value()) as Arc<dyn GuildQueue>)
    }

    fn create_queue(&self, guild_id: GuildId, metadata: QueueMetadata) -> Arc<dyn GuildQueue> {
        self.fake_queue(guild_id, metadata)
    }
}

#[derive(Default)]
pub struct FakeState {
    pub connected: bool,
    pub current: Option<Track>,
    pub upcoming: Vec<Track>,
    pub history: Vec<Track>,
    pub paused: bool,
    pub repeat: RepeatMode,
    pub volume: u8,
    pub filters: Vec<AudioFilter>,
    pub deleted: bool,
    /// How long opening the next stream takes on skip, jump and back.
    pub switch_delay: Duration,
    /// Every stream fails to open, so `play` leaves nothing current.
    pub fail_start: bool,
}

pub struct FakeQueue {
    guild_id: GuildId,
    metadata: QueueMetadata,
    registry: Weak<Registry>,
    pub state: Mutex<FakeState>,
}

impl FakeQueue {
    fn advance(&self) {
        let mut state = self.state.lock().unwrap();
        if let Some(track) = state.current.take() {
            state.history.push(track);
        }
        state.current = if state.upcoming.is_empty() {
            None
        } else {
            Some(state.upcoming.remove(0))
        };
        state.paused = false;
    }

    async fn open_next_stream(&self) {
        let delay = self.state.lock().unwrap().switch_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn titles(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.upcoming.iter().map(|track| track.title.clone()).collect()
    }
}

#[async_trait]
impl GuildQueue for FakeQueue {
    fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    fn metadata(&self) -> QueueMetadata {
        self.metadata
    }

    async fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    async fn connect(&self, _voice_channel: ChannelId) -> Result<(), MusicError> {
        self.state.lock().unwrap().connected = true;
        Ok(())
    }

    async fn current_track(&self) -> Option<Track> {
        self.state.lock().unwrap().current.clone()
    }

    async fn tracks(&self) -> Vec<Track> {
        self.state.lock().unwrap().upcoming.clone()
    }

    async fn upcoming_len(&self) -> usize {
        self.state.lock().unwrap().upcoming.len()
    }

    async fn add_tracks(&self, tracks: Vec<Track>) {
        self.state.lock().unwrap().upcoming.extend(tracks);
    }

    async fn play(&self) -> Result<(), MusicError> {
        let mut state = self.state.lock().unwrap();
        if state.current.is_some() {
            return Ok(());
        }
        if state.fail_start {
            state.upcoming.clear();
            return Ok(());
        }
        drop(state);
        self.advance();
        Ok(())
    }

    async fn is_playing(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.current.is_some() && !state.paused
    }

    async fn is_paused(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.current.is_some() && state.paused
    }

    async fn pause(&self) -> Result<(), MusicError> {
        self.state.lock().unwrap().paused = true;
        Ok(())
    }

    async fn resume(&self) -> Result<(), MusicError> {
        self.state.lock().unwrap().paused = false;
        Ok(())
    }

    async fn skip(&self) -> Result<(), MusicError> {
        self.open_next_stream().await;
        self.advance();
        Ok(())
    }

    async fn seek(&self, _position: Duration) -> Result<(), MusicError> {
        Ok(())
    }

    async fn timestamp(&self) -> Option<Duration> {
        Some(Duration::ZERO)
    }

    async fn volume(&self) -> u8 {
        self.state.lock().unwrap().volume
    }

    async fn set_volume(&self, volume: u8) -> Result<(), MusicError> {
        self.state.lock().unwrap().volume = volume;
        Ok(())
    }

    async fn remove(&self, index: usize) -> Option<Track> {
        let mut state = self.state.lock().unwrap();
        (index < state.upcoming.len()).then(|| state.upcoming.remove(index))
    }

    async fn skip_to(&self, index: usize) -> Result<Track, MusicError> {
        let target = {
            let mut state = self.state.lock().unwrap();
            let len = state.upcoming.len();
            if index >= len {
                return Err(MusicError::InvalidPosition(len));
            }
            state.upcoming.drain(..index);
            state.upcoming[0].clone()
        };
        self.open_next_stream().await;
        self.advance();
        Ok(target)
    }

    async fn shuffle(&self) -> usize {
        let mut state = self.state.lock().unwrap();
        state.upcoming.reverse();
        state.upcoming.len()
    }

    async fn clear(&self) {
        self.state.lock().unwrap().upcoming.clear();
    }

    async fn repeat_mode(&self) -> RepeatMode {
        self.state.lock().unwrap().repeat
    }

    async fn set_repeat_mode(&self, mode: RepeatMode) {
        self.state.lock().unwrap().repeat = mode;
    }

    async fn previous_track(&self) -> Option<Track> {
        self.state.lock().unwrap().history.last().cloned()
    }

    async fn back(&self) -> Result<(), MusicError> {
        self.open_next_stream().await;
        let mut state = self.state.lock().unwrap();
        let previous = state.history.pop().ok_or(MusicError::NoPreviousTrack)?;
        if let Some(current) = state.current.replace(previous) {
            state.upcoming.insert(0, current);
        }
        Ok(())
    }

    async fn filters(&self) -> Vec<AudioFilter> {
        self.state.lock().unwrap().filters.clone()
    }

    async fn toggle_filter(&self, filter: AudioFilter) -> Result<bool, MusicError> {
        let mut state = self.state.lock().unwrap();
        if let Some(index) = state.filters.iter().position(|f| *f == filter) {
            state.filters.remove(index);
            Ok(false)
        } else {
            state.filters.push(filter);
            Ok(true)
        }
    }

    async fn delete(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.deleted = true;
            state.current = None;
            state.upcoming.clear();
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.guild_id);
        }
    }
}

/// One recorded message edit.
#[derive(Debug, Clone, PartialEq)]
pub struct Edit {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub view: MessageView,
}

/// Messenger that assigns increasing message ids and records every call.
/// Messages marked as deleted answer edits with [`EditOutcome::Missing`].
pub struct RecordingMessenger {
    next_id: AtomicU64,
    pub fail_sends: AtomicBool,
    pub sent: Mutex<Vec<(ChannelId, MessageView)>>,
    pub edits: Mutex<Vec<Edit>>,
    deleted: Mutex<HashSet<MessageId>>,
}

impl Default for RecordingMessenger {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1000),
            fail_sends: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            deleted: Mutex::new(HashSet::new()),
        }
    }
}

impl RecordingMessenger {
    pub fn delete(&self, message_id: MessageId) {
        self.deleted.lock().unwrap().insert(message_id);
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn edit_count(&self) -> usize {
        self.edits.lock().unwrap().len()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, view)| view.content.clone())
            .collect()
    }

    pub fn last_edit(&self) -> Option<Edit> {
        self.edits.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, channel_id: ChannelId, view: MessageView) -> Result<MessageId, MusicError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(MusicError::Playback("send rejected".to_string()));
        }
        let id = MessageId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.sent.lock().unwrap().push((channel_id, view));
        Ok(id)
    }

    async fn edit(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        view: MessageView,
    ) -> Result<EditOutcome, MusicError> {
        if self.deleted.lock().unwrap().contains(&message_id) {
            return Ok(EditOutcome::Missing);
        }
        self.edits.lock().unwrap().push(Edit {
            channel_id,
            message_id,
            view,
        });
        Ok(EditOutcome::Edited)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponderCall {
    Acknowledged(Acknowledgement),
    Answered(Acknowledgement, ButtonReply),
}

/// Click responder that records what would have been sent to Discord.
#[derive(Default)]
pub struct RecordingResponder {
    pub calls: Mutex<Vec<ResponderCall>>,
}

impl RecordingResponder {
    pub fn calls(&self) -> Vec<ResponderCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClickResponder for RecordingResponder {
    async fn acknowledge(&self, ack: Acknowledgement) -> Result<(), MusicError> {
        self.calls.lock().unwrap().push(ResponderCall::Acknowledged(ack));
        Ok(())
    }

    async fn answer(&self, ack: Acknowledgement, reply: ButtonReply) -> Result<(), MusicError> {
        self.calls
            .lock()
            .unwrap()
            .push(ResponderCall::Answered(ack, reply));
        Ok(())
    }
}
