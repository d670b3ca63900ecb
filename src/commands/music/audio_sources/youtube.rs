//! Extractor built on songbird's `YoutubeDl` input. It only handles single
//! YouTube videos and free-text searches, and streams through songbird itself.

use crate::commands::music::engine::{SearchResult, Track};
use crate::commands::music::utils::music_manager::MusicError;
use crate::commands::music::utils::selection::MAX_CANDIDATES;
use poise::serenity_prelude::UserId;
use serenity::async_trait;
use songbird::input::{AuxMetadata, Compose, YoutubeDl};
use tracing::info;

use super::{AudioSourceResult, AudioStream, Extractor, ExtractorContext, QueryType};

pub const IDENTIFIER: &str = "songbird-youtube";

pub struct SongbirdYoutube {
    http: reqwest::Client,
}

impl SongbirdYoutube {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

/// Map songbird's metadata onto a track. Needs a page URL to be replayable.
pub fn track_from_aux(metadata: AuxMetadata, requested_by: Option<UserId>) -> Option<Track> {
    let url = metadata.source_url?;
    Some(Track {
        title: metadata
            .title
            .or(metadata.track)
            .unwrap_or_else(|| "Unknown Title".to_string()),
        author: metadata
            .artist
            .or(metadata.channel)
            .unwrap_or_else(|| "Unknown Artist".to_string()),
        url,
        duration: metadata.duration,
        views: None,
        thumbnail: metadata.thumbnail,
        requested_by,
        source: IDENTIFIER.to_string(),
    })
}

fn source_error(err: impl std::fmt::Display) -> MusicError {
    MusicError::AudioSourceError(format!("YoutubeDl failed: {}", err))
}

#[async_trait]
impl Extractor for SongbirdYoutube {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn validate(&self, _query: &str, query_type: QueryType) -> bool {
        matches!(query_type, QueryType::Search | QueryType::YoutubeVideo)
    }

    async fn handle(
        &self,
        query: &str,
        context: ExtractorContext,
    ) -> AudioSourceResult<SearchResult> {
        let requested_by = context.requested_by;

        let tracks = if context.query_type == QueryType::Search {
            info!("Searching with songbird YoutubeDl: {}", query);
            let mut source = YoutubeDl::new_search(self.http.clone(), query.to_string());
            source
                .search(Some(MAX_CANDIDATES))
                .await
                .map_err(source_error)?
                .filter_map(|metadata| track_from_aux(metadata, requested_by))
                .collect()
        } else {
            info!("Fetching metadata with songbird YoutubeDl: {}", query);
            let mut source = YoutubeDl::new(self.http.clone(), query.to_string());
            let metadata = source.aux_metadata().await.map_err(source_error)?;
            track_from_aux(metadata, requested_by).into_iter().collect()
        };

        Ok(SearchResult {
            tracks,
            playlist: None,
        })
    }

    async fn stream(&self, track: &Track) -> AudioSourceResult<AudioStream> {
        let source = YoutubeDl::new(self.http.clone(), track.url.clone());
        Ok(AudioStream::Input(source.into()))
    }
}
