//! Converts `yt-dlp` JSON output into [`Track`]s.
//!
//! `yt-dlp` emits full info dicts for single videos and "flat" entries for
//! searches and playlists; both shapes deserialize into [`YtDlpEntry`].

use crate::commands::music::engine::{Playlist, Track};
use crate::commands::music::utils::music_manager::MusicError;
use poise::serenity_prelude::UserId;
use serde::Deserialize;
use std::time::Duration;

use super::AudioSourceResult;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Thumbnail {
    pub url: String,
}

/// The subset of a `yt-dlp` info dict the bot cares about.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct YtDlpEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub channel: Option<String>,
    pub webpage_url: Option<String>,
    /// For flat entries this is the page URL; for full dicts, the media URL.
    pub url: Option<String>,
    pub ie_key: Option<String>,
    pub duration: Option<f64>,
    pub view_count: Option<u64>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
}

/// Output of `yt-dlp --flat-playlist -J <playlist>`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct YtDlpPlaylist {
    pub title: Option<String>,
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub entries: Vec<YtDlpEntry>,
}

impl YtDlpEntry {
    /// The page URL to hand back to an extractor later. Flat YouTube entries
    /// sometimes only carry the video id.
    fn page_url(&self) -> Option<String> {
        if let Some(url) = &self.webpage_url {
            return Some(url.clone());
        }
        if let Some(url) = self.url.as_ref().filter(|url| url.starts_with("http")) {
            return Some(url.clone());
        }
        match (&self.id, self.ie_key.as_deref()) {
            (Some(id), None | Some("Youtube")) => {
                Some(format!("https://www.youtube.com/watch?v={}", id))
            }
            _ => None,
        }
    }

    fn thumbnail_url(&self) -> Option<String> {
        self.thumbnail
            .clone()
            .or_else(|| self.thumbnails.last().map(|thumb| thumb.url.clone()))
    }

    /// Build a track, or `None` for entries without a usable URL (deleted or
    /// private videos inside playlists show up like this).
    pub fn into_track(self, requested_by: Option<UserId>, source: &str) -> Option<Track> {
        let url = self.page_url()?;
        let thumbnail = self.thumbnail_url();

        Some(Track {
            title: self.title.unwrap_or_else(|| "Unknown Title".to_string()),
            author: self
                .uploader
                .or(self.channel)
                .unwrap_or_else(|| "Unknown Artist".to_string()),
            url,
            duration: self
                .duration
                .filter(|secs| secs.is_finite() && *secs > 0.0)
                .map(Duration::from_secs_f64),
            views: self.view_count,
            thumbnail,
            requested_by,
            source: source.to_string(),
        })
    }
}

impl YtDlpPlaylist {
    pub fn into_parts(
        self,
        fallback_url: &str,
        requested_by: Option<UserId>,
        source: &str,
    ) -> (Playlist, Vec<Track>) {
        let playlist = Playlist {
            title: self.title.unwrap_or_else(|| "Unknown Playlist".to_string()),
            url: self.webpage_url.unwrap_or_else(|| fallback_url.to_string()),
        };
        let tracks = self
            .entries
            .into_iter()
            .filter_map(|entry| entry.into_track(requested_by, source))
            .collect();
        (playlist, tracks)
    }
}

/// Parse one info dict.
pub fn parse_entry(json: &str) -> AudioSourceResult<YtDlpEntry> {
    serde_json::from_str(json).map_err(|e| {
        MusicError::AudioSourceError(format!("Failed to parse video metadata: {}", e))
    })
}

/// Parse `--dump-json` output, one info dict per line. Lines that fail to
/// parse are skipped.
pub fn parse_entries(output: &str) -> Vec<YtDlpEntry> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| parse_entry(line).ok())
        .collect()
}

pub fn parse_playlist(json: &str) -> AudioSourceResult<YtDlpPlaylist> {
    serde_json::from_str(json).map_err(|e| {
        MusicError::AudioSourceError(format!("Failed to parse playlist metadata: {}", e))
    })
}
