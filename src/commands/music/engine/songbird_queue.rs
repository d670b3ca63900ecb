//! Songbird implementation of the playback engine.
//!
//! Each guild gets a [`SongbirdQueue`] holding its own upcoming list, history,
//! repeat mode, volume and filters. Songbird only ever sees one track at a
//! time; when it ends, the queue decides what comes next. Every started track
//! gets a generation number so end events from replaced tracks are ignored.

use dashmap::DashMap;
use poise::serenity_prelude::{ChannelId, GuildId, UserId};
use rand::seq::SliceRandom;
use serenity::async_trait;
use songbird::input::{HttpRequest, Input};
use songbird::tracks::{PlayMode, TrackHandle};
use songbird::{CoreEvent, Event, EventContext, Songbird, TrackEvent};
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use super::filters;
use super::{
    AudioFilter, GuildQueue, PlaybackEngine, QueueMetadata, RepeatMode, SearchResult, Track,
};
use crate::commands::music::audio_sources::{AudioStream, Extractors};
use crate::commands::music::utils::event_handlers::{PlayerEvent, PlayerEventKind};
use crate::commands::music::utils::music_manager::MusicError;
use crate::config::Config;

const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub default_volume: u8,
    pub leave_on_empty_cooldown: Duration,
    pub leave_on_end_cooldown: Duration,
    pub ffmpeg_path: String,
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            default_volume: config.default_volume,
            leave_on_empty_cooldown: config.leave_on_empty_cooldown,
            leave_on_end_cooldown: config.leave_on_end_cooldown,
            ffmpeg_path: config.ffmpeg_path.clone(),
        }
    }
}

type QueueRegistry = DashMap<GuildId, Arc<SongbirdQueue>>;

pub struct SongbirdEngine {
    manager: Arc<Songbird>,
    extractors: Arc<Extractors>,
    http: reqwest::Client,
    settings: EngineSettings,
    events: UnboundedSender<PlayerEvent>,
    queues: Arc<QueueRegistry>,
}

impl SongbirdEngine {
    pub fn new(
        manager: Arc<Songbird>,
        extractors: Arc<Extractors>,
        http: reqwest::Client,
        settings: EngineSettings,
        events: UnboundedSender<PlayerEvent>,
    ) -> Self {
        Self {
            manager,
            extractors,
            http,
            settings,
            events,
            queues: Arc::new(DashMap::new()),
        }
    }
}

#[async_trait]
impl PlaybackEngine for SongbirdEngine {
    async fn search(&self, query: &str, requested_by: UserId) -> Result<SearchResult, MusicError> {
        self.extractors.search(query, Some(requested_by)).await
    }

    fn queue(&self, guild_id: GuildId) -> Option<Arc<dyn GuildQueue>> {
        self.queues
            .get(&guild_id)
            .map(|entry| Arc::clone(entry.value()) as Arc<dyn GuildQueue>)
    }

    fn create_queue(&self, guild_id: GuildId, metadata: QueueMetadata) -> Arc<dyn GuildQueue> {
        let entry = self.queues.entry(guild_id).or_insert_with(|| {
            info!("Creating queue for guild {}", guild_id);
            SongbirdQueue::new(guild_id, metadata, self)
        });
        Arc::clone(entry.value()) as Arc<dyn GuildQueue>
    }
}

struct NowPlaying {
    track: Track,
    /// `None` while the stream is still being opened.
    handle: Option<TrackHandle>,
    /// Where the underlying stream started, for inputs that cannot seek.
    offset: Duration,
}

#[derive(Default)]
struct QueueState {
    current: Option<NowPlaying>,
    upcoming: VecDeque<Track>,
    history: Vec<Track>,
    repeat: RepeatMode,
    volume: u8,
    paused: bool,
    filters: Vec<AudioFilter>,
    generation: u64,
    deleted: bool,
    empty_epoch: u64,
    end_epoch: u64,
}

impl QueueState {
    fn remember(&mut self, track: Track) {
        self.history.push(track);
        if self.history.len() > HISTORY_LIMIT {
            self.history.remove(0);
        }
    }

    /// Stop and detach the current track. Bumps the generation so its end
    /// event is treated as stale.
    fn take_current(&mut self) -> Option<NowPlaying> {
        self.generation += 1;
        let now = self.current.take();
        if let Some(handle) = now.as_ref().and_then(|now| now.handle.as_ref()) {
            if let Err(err) = handle.stop() {
                debug!("Stopping a finished track: {}", err);
            }
        }
        now
    }
}

pub struct SongbirdQueue {
    guild_id: GuildId,
    metadata: QueueMetadata,
    manager: Arc<Songbird>,
    extractors: Arc<Extractors>,
    http: reqwest::Client,
    settings: EngineSettings,
    events: UnboundedSender<PlayerEvent>,
    registry: Weak<QueueRegistry>,
    me: Weak<SongbirdQueue>,
    state: Mutex<QueueState>,
}

fn volume_scale(volume: u8) -> f32 {
    f32::from(volume) / 100.0
}

fn playback_error(err: impl std::fmt::Display) -> MusicError {
    MusicError::Playback(err.to_string())
}

impl SongbirdQueue {
    fn new(guild_id: GuildId, metadata: QueueMetadata, engine: &SongbirdEngine) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            guild_id,
            metadata,
            manager: Arc::clone(&engine.manager),
            extractors: Arc::clone(&engine.extractors),
            http: engine.http.clone(),
            settings: engine.settings.clone(),
            events: engine.events.clone(),
            registry: Arc::downgrade(&engine.queues),
            me: me.clone(),
            state: Mutex::new(QueueState {
                volume: engine.settings.default_volume.min(100),
                ..Default::default()
            }),
        })
    }

    fn emit(&self, kind: PlayerEventKind) {
        let event = PlayerEvent {
            guild_id: self.guild_id,
            channel_id: self.metadata.text_channel,
            kind,
        };
        if self.events.send(event).is_err() {
            debug!("No listener for player events in guild {}", self.guild_id);
        }
    }

    /// Resolve a playable input for `track`. Returns the input and the
    /// position its audio starts at.
    async fn open(
        &self,
        track: &Track,
        filters: &[AudioFilter],
        offset: Duration,
    ) -> Result<(Input, Duration), MusicError> {
        match self.extractors.stream(track).await? {
            AudioStream::Url(url) if !filters.is_empty() => {
                let input =
                    filters::spawn_filtered(&self.settings.ffmpeg_path, &url, filters, offset)?;
                Ok((input, offset))
            }
            AudioStream::Url(url) => Ok((HttpRequest::new(self.http.clone(), url).into(), Duration::ZERO)),
            AudioStream::Input(input) => {
                if !filters.is_empty() {
                    warn!(
                        "'{}' has no direct stream URL, playing without filters",
                        track.title
                    );
                }
                Ok((input, Duration::ZERO))
            }
        }
    }

    /// Make `track` current and start it at `offset`. If something else
    /// replaced it while the stream was being opened, the new handle is
    /// stopped and nothing changes.
    async fn start(&self, track: Track, offset: Duration) -> Result<(), MusicError> {
        let (generation, filters, volume) = {
            let mut state = self.state.lock().await;
            if state.deleted {
                return Ok(());
            }
            state.take_current();
            state.current = Some(NowPlaying {
                track: track.clone(),
                handle: None,
                offset,
            });
            state.paused = false;
            state.end_epoch += 1;
            (state.generation, state.filters.clone(), state.volume)
        };

        let (input, starts_at) = match self.open(&track, &filters, offset).await {
            Ok(opened) => opened,
            Err(err) => {
                self.abandon(generation).await;
                return Err(err);
            }
        };
        let Some(call) = self.manager.get(self.guild_id) else {
            self.abandon(generation).await;
            return Err(MusicError::NotConnected);
        };
        let handle = call.lock().await.play_input(input);

        let mut state = self.state.lock().await;
        if state.deleted || state.generation != generation {
            debug!("'{}' was replaced before it started", track.title);
            if let Err(err) = handle.stop() {
                debug!("Stopping a replaced track: {}", err);
            }
            return Ok(());
        }

        if let Err(err) = handle.set_volume(volume_scale(volume)) {
            warn!("Failed to set volume for guild {}: {}", self.guild_id, err);
        }
        for event in [TrackEvent::End, TrackEvent::Error] {
            let notifier = TrackEndNotifier {
                queue: self.me.clone(),
                generation,
            };
            if let Err(err) = handle.add_event(Event::Track(event), notifier) {
                warn!("Failed to watch track events in guild {}: {}", self.guild_id, err);
            }
        }
        if offset > starts_at {
            // Result arrives asynchronously; position is read back from the handle.
            drop(handle.seek(offset));
        }
        if state.paused {
            if let Err(err) = handle.pause() {
                warn!("Failed to pause fresh track in guild {}: {}", self.guild_id, err);
            }
        }

        state.current = Some(NowPlaying {
            track: track.clone(),
            handle: Some(handle),
            offset: starts_at,
        });
        drop(state);

        info!("Now playing '{}' in guild {}", track.title, self.guild_id);
        self.emit(PlayerEventKind::PlayerStart(track));
        Ok(())
    }

    async fn abandon(&self, generation: u64) {
        let mut state = self.state.lock().await;
        if state.generation == generation {
            state.current = None;
        }
    }

    /// Move past the current track and start whatever follows. `expected`
    /// guards against end events of tracks that were already replaced.
    async fn advance(&self, expected: Option<u64>, finished: bool) {
        let next = {
            let mut state = self.state.lock().await;
            if state.deleted || expected.is_some_and(|generation| generation != state.generation) {
                return;
            }
            match state.take_current().map(|now| now.track) {
                Some(track) if finished && state.repeat == RepeatMode::Track => Some(track),
                Some(track) => {
                    if state.repeat == RepeatMode::Queue {
                        state.upcoming.push_back(track.clone());
                    }
                    state.remember(track);
                    state.upcoming.pop_front()
                }
                None => state.upcoming.pop_front(),
            }
        };
        self.play_from(next).await;
    }

    /// Start `next`, skipping over tracks that fail to open.
    async fn play_from(&self, mut next: Option<Track>) {
        while let Some(track) = next.take() {
            match self.start(track.clone(), Duration::ZERO).await {
                Ok(()) => return,
                Err(MusicError::NotConnected) => {
                    self.emit(PlayerEventKind::Error(
                        MusicError::NotConnected.to_string(),
                    ));
                    return;
                }
                Err(err) => {
                    error!("Failed to start '{}': {}", track.title, err);
                    self.emit(PlayerEventKind::PlayerError(format!(
                        "{}: {}",
                        track.title, err
                    )));
                    next = self.state.lock().await.upcoming.pop_front();
                }
            }
        }
        self.drained().await;
    }

    /// Nothing left to play: keep going with a related track in autoplay
    /// mode, otherwise announce the end and schedule leaving.
    async fn drained(&self) {
        let (repeat, last) = {
            let state = self.state.lock().await;
            if state.deleted || state.current.is_some() {
                return;
            }
            (state.repeat, state.history.last().cloned())
        };

        if repeat == RepeatMode::Autoplay {
            if let Some(last) = last {
                if let Some(track) = self.related_to(&last).await {
                    self.emit(PlayerEventKind::Debug(format!(
                        "Autoplay picked '{}' after '{}'",
                        track.title, last.title
                    )));
                    match self.start(track, Duration::ZERO).await {
                        Ok(()) => return,
                        Err(err) => self.emit(PlayerEventKind::PlayerError(err.to_string())),
                    }
                }
            }
        }

        self.emit(PlayerEventKind::EmptyQueue);
        self.schedule_leave_on_end().await;
    }

    async fn related_to(&self, last: &Track) -> Option<Track> {
        let query = format!("{} {}", last.author, last.title);
        let result = match self.extractors.search(&query, last.requested_by).await {
            Ok(result) => result,
            Err(err) => {
                warn!("Autoplay search failed in guild {}: {}", self.guild_id, err);
                return None;
            }
        };

        let state = self.state.lock().await;
        result.tracks.into_iter().find(|candidate| {
            candidate.url != last.url && !state.history.iter().any(|played| played.url == candidate.url)
        })
    }

    async fn schedule_leave_on_end(&self) {
        let epoch = {
            let mut state = self.state.lock().await;
            state.end_epoch += 1;
            state.end_epoch
        };
        let Some(queue) = self.me.upgrade() else {
            return;
        };
        let cooldown = self.settings.leave_on_end_cooldown;

        tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            let idle = {
                let state = queue.state.lock().await;
                !state.deleted && state.end_epoch == epoch && state.current.is_none()
            };
            if idle {
                info!("Leaving guild {} after the queue ended", queue.guild_id);
                queue.delete().await;
            }
        });
    }

    /// Restart the current track at `position`, e.g. after the filters changed.
    async fn restart(&self, position: Duration) -> Result<(), MusicError> {
        let (track, was_paused) = {
            let state = self.state.lock().await;
            let now = state.current.as_ref().ok_or(MusicError::NothingPlaying)?;
            (now.track.clone(), state.paused)
        };
        self.start(track, position).await?;
        if was_paused {
            self.pause().await?;
        }
        Ok(())
    }

    async fn track_finished(&self, generation: u64, failure: Option<String>) {
        let finished = failure.is_none();
        if let Some(message) = failure {
            {
                let state = self.state.lock().await;
                if state.deleted || state.generation != generation {
                    return;
                }
            }
            self.emit(PlayerEventKind::PlayerError(message));
        }
        self.advance(Some(generation), finished).await;
    }

    /// Songbird lost the voice connection; tear the queue down if the bot is
    /// no longer in a channel.
    async fn voice_dropped(&self) {
        let connected = match self.manager.get(self.guild_id) {
            Some(call) => call.lock().await.current_channel().is_some(),
            None => false,
        };
        if !connected {
            info!("Voice connection for guild {} dropped", self.guild_id);
            self.delete().await;
        }
    }
}

#[async_trait]
impl GuildQueue for SongbirdQueue {
    fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    fn metadata(&self) -> QueueMetadata {
        self.metadata
    }

    async fn is_connected(&self) -> bool {
        match self.manager.get(self.guild_id) {
            Some(call) => call.lock().await.current_channel().is_some(),
            None => false,
        }
    }

    async fn connect(&self, voice_channel: ChannelId) -> Result<(), MusicError> {
        info!(
            "Joining voice channel {} in guild {}",
            voice_channel, self.guild_id
        );
        let call = self
            .manager
            .join(self.guild_id, voice_channel)
            .await
            .map_err(|e| MusicError::JoinError(e.to_string()))?;

        let mut handler = call.lock().await;
        handler.remove_all_global_events();
        handler.add_global_event(
            Event::Core(CoreEvent::DriverDisconnect),
            DisconnectNotifier {
                queue: self.me.clone(),
            },
        );
        if let Err(err) = handler.deafen(true).await {
            warn!("Failed to self-deafen in guild {}: {}", self.guild_id, err);
        }
        Ok(())
    }

    async fn current_track(&self) -> Option<Track> {
        let state = self.state.lock().await;
        state.current.as_ref().map(|now| now.track.clone())
    }

    async fn tracks(&self) -> Vec<Track> {
        self.state.lock().await.upcoming.iter().cloned().collect()
    }

    async fn upcoming_len(&self) -> usize {
        self.state.lock().await.upcoming.len()
    }

    async fn add_tracks(&self, tracks: Vec<Track>) {
        let announced = match tracks.as_slice() {
            [single] => Some(single.clone()),
            _ => None,
        };
        {
            let mut state = self.state.lock().await;
            if state.deleted {
                return;
            }
            debug!(
                "Adding {} track(s) to guild {}'s queue",
                tracks.len(),
                self.guild_id
            );
            state.upcoming.extend(tracks);
        }
        if let Some(track) = announced {
            self.emit(PlayerEventKind::AudioTrackAdd(track));
        }
    }

    async fn play(&self) -> Result<(), MusicError> {
        let next = {
            let mut state = self.state.lock().await;
            if state.deleted || state.current.is_some() {
                return Ok(());
            }
            state.upcoming.pop_front()
        };
        if next.is_some() {
            self.play_from(next).await;
        }
        Ok(())
    }

    async fn is_playing(&self) -> bool {
        let state = self.state.lock().await;
        state.current.is_some() && !state.paused
    }

    async fn is_paused(&self) -> bool {
        let state = self.state.lock().await;
        state.current.is_some() && state.paused
    }

    async fn pause(&self) -> Result<(), MusicError> {
        let mut state = self.state.lock().await;
        let now = state.current.as_ref().ok_or(MusicError::NothingPlaying)?;
        if let Some(handle) = &now.handle {
            handle.pause().map_err(playback_error)?;
        }
        state.paused = true;
        Ok(())
    }

    async fn resume(&self) -> Result<(), MusicError> {
        let mut state = self.state.lock().await;
        let now = state.current.as_ref().ok_or(MusicError::NothingPlaying)?;
        if let Some(handle) = &now.handle {
            handle.play().map_err(playback_error)?;
        }
        state.paused = false;
        Ok(())
    }

    async fn skip(&self) -> Result<(), MusicError> {
        if self.state.lock().await.current.is_none() {
            return Err(MusicError::NothingPlaying);
        }
        self.advance(None, false).await;
        Ok(())
    }

    async fn seek(&self, position: Duration) -> Result<(), MusicError> {
        let (handle, filtered) = {
            let state = self.state.lock().await;
            let now = state.current.as_ref().ok_or(MusicError::NothingPlaying)?;
            (now.handle.clone(), !state.filters.is_empty())
        };

        match handle {
            Some(handle) if !filtered => {
                handle
                    .seek(position)
                    .result_async()
                    .await
                    .map_err(playback_error)?;
                Ok(())
            }
            _ => self.restart(position).await,
        }
    }

    async fn timestamp(&self) -> Option<Duration> {
        let (handle, offset) = {
            let state = self.state.lock().await;
            let now = state.current.as_ref()?;
            (now.handle.clone()?, now.offset)
        };
        let info = handle.get_info().await.ok()?;
        Some(info.position + offset)
    }

    async fn volume(&self) -> u8 {
        self.state.lock().await.volume
    }

    async fn set_volume(&self, volume: u8) -> Result<(), MusicError> {
        let mut state = self.state.lock().await;
        state.volume = volume.min(100);
        if let Some(handle) = state.current.as_ref().and_then(|now| now.handle.as_ref()) {
            handle
                .set_volume(volume_scale(state.volume))
                .map_err(playback_error)?;
        }
        Ok(())
    }

    async fn remove(&self, index: usize) -> Option<Track> {
        self.state.lock().await.upcoming.remove(index)
    }

    async fn skip_to(&self, index: usize) -> Result<Track, MusicError> {
        let target = {
            let mut state = self.state.lock().await;
            let len = state.upcoming.len();
            if index >= len {
                return Err(MusicError::InvalidPosition(len));
            }
            state.upcoming.drain(..index);
            state
                .upcoming
                .front()
                .cloned()
                .ok_or(MusicError::InvalidPosition(len))?
        };
        self.advance(None, false).await;
        Ok(target)
    }

    async fn shuffle(&self) -> usize {
        let mut state = self.state.lock().await;
        let count = state.upcoming.len();
        state.upcoming.make_contiguous().shuffle(&mut rand::rng());
        count
    }

    async fn clear(&self) {
        self.state.lock().await.upcoming.clear();
    }

    async fn repeat_mode(&self) -> RepeatMode {
        self.state.lock().await.repeat
    }

    async fn set_repeat_mode(&self, mode: RepeatMode) {
        self.state.lock().await.repeat = mode;
    }

    async fn previous_track(&self) -> Option<Track> {
        self.state.lock().await.history.last().cloned()
    }

    async fn back(&self) -> Result<(), MusicError> {
        let previous = {
            let mut state = self.state.lock().await;
            let previous = state.history.pop().ok_or(MusicError::NoPreviousTrack)?;
            if let Some(now) = state.take_current() {
                state.upcoming.push_front(now.track);
            }
            previous
        };
        self.start(previous, Duration::ZERO).await
    }

    async fn filters(&self) -> Vec<AudioFilter> {
        self.state.lock().await.filters.clone()
    }

    async fn toggle_filter(&self, filter: AudioFilter) -> Result<bool, MusicError> {
        let (enabled, playing) = {
            let mut state = self.state.lock().await;
            let enabled = match state.filters.iter().position(|f| *f == filter) {
                Some(index) => {
                    state.filters.remove(index);
                    false
                }
                None => {
                    state.filters.push(filter);
                    true
                }
            };
            (enabled, state.current.is_some())
        };

        if playing {
            let position = self.timestamp().await.unwrap_or_default();
            self.restart(position).await?;
        }
        info!(
            "Filter {} {} in guild {}",
            filter.name(),
            if enabled { "enabled" } else { "disabled" },
            self.guild_id
        );
        Ok(enabled)
    }

    async fn listeners_changed(&self, listeners: usize) {
        let epoch = {
            let mut state = self.state.lock().await;
            if state.deleted {
                return;
            }
            state.empty_epoch += 1;
            state.empty_epoch
        };
        if listeners > 0 {
            return;
        }
        let Some(queue) = self.me.upgrade() else {
            return;
        };
        let cooldown = self.settings.leave_on_empty_cooldown;
        debug!(
            "Voice channel in guild {} is empty, leaving in {:?}",
            self.guild_id, cooldown
        );

        tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            let still_empty = {
                let state = queue.state.lock().await;
                !state.deleted && state.empty_epoch == epoch
            };
            if still_empty {
                queue.emit(PlayerEventKind::EmptyChannel);
                queue.delete().await;
            }
        });
    }

    async fn delete(&self) {
        {
            let mut state = self.state.lock().await;
            if state.deleted {
                return;
            }
            state.deleted = true;
            state.take_current();
            state.upcoming.clear();
            state.empty_epoch += 1;
            state.end_epoch += 1;
        }

        if let Some(registry) = self.registry.upgrade() {
            registry.remove_if(&self.guild_id, |_, queue| std::ptr::eq(Arc::as_ptr(queue), self));
        }
        if self.manager.get(self.guild_id).is_some() {
            if let Err(err) = self.manager.remove(self.guild_id).await {
                warn!("Failed to leave voice in guild {}: {}", self.guild_id, err);
            }
        }

        info!("Deleted queue for guild {}", self.guild_id);
        self.emit(PlayerEventKind::Disconnect);
    }
}

/// Fires when a track ends or errors.
struct TrackEndNotifier {
    queue: Weak<SongbirdQueue>,
    generation: u64,
}

#[async_trait]
impl songbird::EventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let EventContext::Track(tracks) = ctx else {
            return None;
        };
        let failure = tracks.iter().find_map(|(state, _)| match &state.playing {
            PlayMode::Errored(err) => Some(err.to_string()),
            _ => None,
        });

        if let Some(queue) = self.queue.upgrade() {
            let generation = self.generation;
            tokio::spawn(async move { queue.track_finished(generation, failure).await });
        }
        None
    }
}

struct DisconnectNotifier {
    queue: Weak<SongbirdQueue>,
}

#[async_trait]
impl songbird::EventHandler for DisconnectNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::DriverDisconnect(_) = ctx {
            if let Some(queue) = self.queue.upgrade() {
                tokio::spawn(async move { queue.voice_dropped().await });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    const GUILD: u64 = 1;

    fn settings() -> EngineSettings {
        EngineSettings {
            default_volume: 50,
            leave_on_empty_cooldown: Duration::from_secs(300),
            leave_on_end_cooldown: Duration::from_secs(300),
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }

    fn engine() -> (SongbirdEngine, UnboundedReceiver<PlayerEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let engine = SongbirdEngine::new(
            Songbird::serenity(),
            Arc::new(Extractors::new(Vec::new())),
            reqwest::Client::new(),
            settings(),
            events,
        );
        (engine, receiver)
    }

    fn metadata() -> QueueMetadata {
        QueueMetadata {
            text_channel: ChannelId::new(10),
            voice_channel: ChannelId::new(20),
        }
    }

    fn track(n: usize) -> Track {
        Track {
            title: format!("Track {}", n),
            author: "Band".to_string(),
            url: format!("https://www.youtube.com/watch?v=t{}", n),
            duration: Some(Duration::from_secs(120)),
            views: None,
            thumbnail: None,
            requested_by: None,
            source: "yt-dlp".to_string(),
        }
    }

    fn titles(tracks: &[Track]) -> Vec<String> {
        tracks.iter().map(|track| track.title.clone()).collect()
    }

    fn drain(receiver: &mut UnboundedReceiver<PlayerEvent>) -> Vec<PlayerEventKind> {
        let mut kinds = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            kinds.push(event.kind);
        }
        kinds
    }

    #[test]
    fn test_volume_scale() {
        assert_eq!(volume_scale(100), 1.0);
        assert_eq!(volume_scale(0), 0.0);
        assert_eq!(volume_scale(50), 0.5);
    }

    #[test]
    fn test_history_is_capped() {
        let mut state = QueueState::default();
        for n in 0..HISTORY_LIMIT + 5 {
            state.remember(track(n));
        }
        assert_eq!(state.history.len(), HISTORY_LIMIT);
        assert_eq!(state.history[0].title, "Track 5");
    }

    #[tokio::test]
    async fn test_create_queue_is_get_or_create() {
        let (engine, _events) = engine();
        let guild = GuildId::new(GUILD);

        let first = engine.create_queue(guild, metadata());
        first.add_tracks(vec![track(1)]).await;
        let second = engine.create_queue(guild, metadata());

        assert_eq!(second.upcoming_len().await, 1);
        assert_eq!(second.volume().await, 50);
        assert!(engine.queue(GuildId::new(2)).is_none());
    }

    #[tokio::test]
    async fn test_upcoming_list_operations() {
        let (engine, mut events) = engine();
        let queue = engine.create_queue(GuildId::new(GUILD), metadata());

        queue.add_tracks((1..=4).map(track).collect()).await;
        assert!(drain(&mut events).is_empty());

        assert_eq!(queue.remove(1).await.map(|t| t.title), Some("Track 2".to_string()));
        assert_eq!(queue.remove(7).await, None);
        assert_eq!(titles(&queue.tracks().await), vec!["Track 1", "Track 3", "Track 4"]);

        assert_eq!(queue.shuffle().await, 3);
        let mut shuffled = titles(&queue.tracks().await);
        shuffled.sort();
        assert_eq!(shuffled, vec!["Track 1", "Track 3", "Track 4"]);

        queue.clear().await;
        assert_eq!(queue.upcoming_len().await, 0);
    }

    #[tokio::test]
    async fn test_single_add_is_announced() {
        let (engine, mut events) = engine();
        let queue = engine.create_queue(GuildId::new(GUILD), metadata());

        queue.add_tracks(vec![track(1)]).await;

        assert_eq!(
            drain(&mut events),
            vec![PlayerEventKind::AudioTrackAdd(track(1))]
        );
    }

    #[tokio::test]
    async fn test_idle_queue_rejects_transport_controls() {
        let (engine, _events) = engine();
        let queue = engine.create_queue(GuildId::new(GUILD), metadata());

        assert!(matches!(queue.pause().await, Err(MusicError::NothingPlaying)));
        assert!(matches!(queue.skip().await, Err(MusicError::NothingPlaying)));
        assert!(matches!(queue.back().await, Err(MusicError::NoPreviousTrack)));
        assert!(matches!(
            queue.skip_to(0).await,
            Err(MusicError::InvalidPosition(0))
        ));
        assert!(!queue.is_playing().await);
        assert_eq!(queue.timestamp().await, None);
    }

    #[tokio::test]
    async fn test_filters_toggle_without_playback() {
        let (engine, _events) = engine();
        let queue = engine.create_queue(GuildId::new(GUILD), metadata());

        assert!(queue.toggle_filter(AudioFilter::BassBoost).await.unwrap());
        assert_eq!(queue.filters().await, vec![AudioFilter::BassBoost]);
        assert!(!queue.toggle_filter(AudioFilter::BassBoost).await.unwrap());
        assert!(queue.filters().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_unregisters_and_announces_once() {
        let (engine, mut events) = engine();
        let guild = GuildId::new(GUILD);
        let queue = engine.create_queue(guild, metadata());
        queue.add_tracks((1..=3).map(track).collect()).await;

        queue.delete().await;
        queue.delete().await;

        assert!(engine.queue(guild).is_none());
        assert_eq!(drain(&mut events), vec![PlayerEventKind::Disconnect]);
        assert_eq!(queue.upcoming_len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_channel_leaves_after_cooldown() {
        let (engine, mut events) = engine();
        let guild = GuildId::new(GUILD);
        let queue = engine.create_queue(guild, metadata());

        queue.listeners_changed(0).await;
        tokio::time::sleep(Duration::from_secs(301)).await;

        assert!(engine.queue(guild).is_none());
        assert_eq!(
            drain(&mut events),
            vec![PlayerEventKind::EmptyChannel, PlayerEventKind::Disconnect]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_listener_returning_cancels_leave() {
        let (engine, mut events) = engine();
        let guild = GuildId::new(GUILD);
        let queue = engine.create_queue(guild, metadata());

        queue.listeners_changed(0).await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        queue.listeners_changed(1).await;
        tokio::time::sleep(Duration::from_secs(600)).await;

        assert!(engine.queue(guild).is_some());
        assert!(drain(&mut events).is_empty());
    }
}
