//! Extraction adapters: the interchangeable strategies the engine uses to turn a
//! query into tracks, and a track into something songbird can play.
//!
//! Two adapters are registered by default, tried in order:
//! * [`ytdlp::YtDlpExtractor`] shells out to `yt-dlp` and understands playlists.
//! * [`youtube::SongbirdYoutube`] goes through songbird's own `YoutubeDl` source.

pub(crate) mod track_metadata;
pub(crate) mod youtube;
pub(crate) mod ytdlp;

use crate::commands::music::engine::{SearchResult, Track};
use crate::commands::music::utils::music_manager::MusicError;
use poise::serenity_prelude::UserId;
use regex::Regex;
use serenity::async_trait;
use songbird::input::Input;
use std::fmt;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};
use url::Url;

/// A specialized `Result` type for operations within the `audio_sources` module.
pub type AudioSourceResult<T> = Result<T, MusicError>;

static YOUTUBE_PLAYLIST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.|m\.|music\.)?youtube\.com/playlist\?(?:\S*&)?list=[\w\-]+")
        .expect("playlist regex is valid")
});

/// What kind of query an extractor is being asked to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// Free text to search for.
    Search,
    YoutubeVideo,
    YoutubePlaylist,
    /// Any other http(s) URL.
    Url,
}

impl QueryType {
    pub fn resolve(query: &str) -> Self {
        let Ok(url) = Url::parse(query.trim()) else {
            return QueryType::Search;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return QueryType::Search;
        }

        // Watch URLs that also carry `list=` stay single videos.
        if YOUTUBE_PLAYLIST_REGEX.is_match(query.trim()) {
            QueryType::YoutubePlaylist
        } else if is_youtube_video(&url) {
            QueryType::YoutubeVideo
        } else {
            QueryType::Url
        }
    }

    pub fn is_url(self) -> bool {
        self != QueryType::Search
    }
}

fn is_youtube_video(url: &Url) -> bool {
    match url.host_str() {
        Some("youtu.be") => url.path().len() > 1,
        Some("www.youtube.com" | "youtube.com" | "m.youtube.com" | "music.youtube.com") => {
            url.path().starts_with("/watch") || url.path().starts_with("/shorts/")
        }
        _ => false,
    }
}

/// Per-request information handed to an extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractorContext {
    pub query_type: QueryType,
    pub requested_by: Option<UserId>,
}

/// A playable source for a track.
pub enum AudioStream {
    /// A direct media URL; the engine decides how to open it.
    Url(String),
    /// A ready songbird input.
    Input(Input),
}

impl fmt::Debug for AudioStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioStream::Url(url) => f.debug_tuple("Url").field(url).finish(),
            AudioStream::Input(_) => f.write_str("Input(..)"),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Stable name, stored on every track this extractor produces.
    fn identifier(&self) -> &'static str;

    fn validate(&self, query: &str, query_type: QueryType) -> bool;

    async fn handle(
        &self,
        query: &str,
        context: ExtractorContext,
    ) -> AudioSourceResult<SearchResult>;

    async fn stream(&self, track: &Track) -> AudioSourceResult<AudioStream>;
}

/// The registered extractors, in priority order.
#[derive(Clone)]
pub struct Extractors {
    extractors: Vec<Arc<dyn Extractor>>,
}

impl Extractors {
    pub fn new(extractors: Vec<Arc<dyn Extractor>>) -> Self {
        Self { extractors }
    }

    /// The yt-dlp process adapter first, songbird's `YoutubeDl` second.
    pub fn with_defaults(ytdlp_path: &str, http: reqwest::Client) -> Self {
        Self::new(vec![
            Arc::new(ytdlp::YtDlpExtractor::new(ytdlp_path)),
            Arc::new(youtube::SongbirdYoutube::new(http)),
        ])
    }

    /// Ask each extractor that accepts the query in turn. The first non-empty
    /// result wins; a failing extractor only matters if every one fails.
    pub async fn search(
        &self,
        query: &str,
        requested_by: Option<UserId>,
    ) -> AudioSourceResult<SearchResult> {
        let context = ExtractorContext {
            query_type: QueryType::resolve(query),
            requested_by,
        };
        let mut last_error = None;
        let mut tried = 0;
        let mut failed = 0;

        for extractor in &self.extractors {
            if !extractor.validate(query, context.query_type) {
                continue;
            }
            tried += 1;

            match extractor.handle(query, context).await {
                Ok(result) if !result.is_empty() => {
                    info!(
                        "{} resolved '{}' to {} track(s)",
                        extractor.identifier(),
                        query,
                        result.tracks.len()
                    );
                    return Ok(result);
                }
                Ok(_) => debug!("{} found nothing for '{}'", extractor.identifier(), query),
                Err(err) => {
                    warn!("{} failed for '{}': {}", extractor.identifier(), query, err);
                    failed += 1;
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) if failed == tried => Err(err),
            _ => Ok(SearchResult::default()),
        }
    }

    /// Open a stream for `track`, preferring the extractor that produced it.
    pub async fn stream(&self, track: &Track) -> AudioSourceResult<AudioStream> {
        let mut ordered: Vec<&Arc<dyn Extractor>> = self.extractors.iter().collect();
        ordered.sort_by_key(|extractor| extractor.identifier() != track.source);

        let mut last_error = MusicError::AudioSourceError("No extractor available".to_string());
        for extractor in ordered {
            match extractor.stream(track).await {
                Ok(stream) => return Ok(stream),
                Err(err) => {
                    warn!(
                        "{} could not stream '{}': {}",
                        extractor.identifier(),
                        track.title,
                        err
                    );
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }
}
