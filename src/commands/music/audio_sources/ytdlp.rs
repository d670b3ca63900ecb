//! Extractor backed by the `yt-dlp` executable.

use crate::commands::music::engine::{SearchResult, Track};
use crate::commands::music::utils::music_manager::MusicError;
use crate::commands::music::utils::selection::MAX_CANDIDATES;
use serenity::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::track_metadata::{parse_entries, parse_entry, parse_playlist};
use super::{AudioSourceResult, AudioStream, Extractor, ExtractorContext, QueryType};

pub const IDENTIFIER: &str = "yt-dlp";

pub struct YtDlpExtractor {
    program: String,
}

impl YtDlpExtractor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run yt-dlp and return its stdout, failing on a non-zero exit.
    async fn run(&self, args: &[&str]) -> AudioSourceResult<String> {
        debug!("Running {} {:?}", self.program, args);
        let output = Command::new(&self.program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MusicError::AudioSourceError(format!("Failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MusicError::AudioSourceError(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                stderr.lines().last().unwrap_or("no output")
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    /// yt-dlp understands free text and nearly every media site.
    fn validate(&self, _query: &str, _query_type: QueryType) -> bool {
        true
    }

    async fn handle(
        &self,
        query: &str,
        context: ExtractorContext,
    ) -> AudioSourceResult<SearchResult> {
        let requested_by = context.requested_by;

        match context.query_type {
            QueryType::Search => {
                info!("Searching with yt-dlp: {}", query);
                let search = format!("ytsearch{}:{}", MAX_CANDIDATES, query);
                let stdout = self
                    .run(&["--dump-json", "--flat-playlist", "--no-warnings", &search])
                    .await?;
                let tracks = parse_entries(&stdout)
                    .into_iter()
                    .filter_map(|entry| entry.into_track(requested_by, IDENTIFIER))
                    .collect();
                Ok(SearchResult {
                    tracks,
                    playlist: None,
                })
            }
            QueryType::YoutubePlaylist => {
                info!("Loading playlist with yt-dlp: {}", query);
                let stdout = self
                    .run(&["--flat-playlist", "-J", "--no-warnings", query])
                    .await?;
                let (playlist, tracks) =
                    parse_playlist(&stdout)?.into_parts(query, requested_by, IDENTIFIER);
                Ok(SearchResult {
                    tracks,
                    playlist: Some(playlist),
                })
            }
            QueryType::YoutubeVideo | QueryType::Url => {
                info!("Fetching metadata with yt-dlp: {}", query);
                let stdout = self
                    .run(&["--dump-json", "--no-playlist", "--no-warnings", query])
                    .await?;
                let tracks = parse_entry(stdout.trim())?
                    .into_track(requested_by, IDENTIFIER)
                    .into_iter()
                    .collect();
                Ok(SearchResult {
                    tracks,
                    playlist: None,
                })
            }
        }
    }

    /// Resolve the best audio-only format to a direct media URL.
    async fn stream(&self, track: &Track) -> AudioSourceResult<AudioStream> {
        let stdout = self
            .run(&[
                "-f",
                "bestaudio/ba/b",
                "-g",
                "--no-playlist",
                "--no-warnings",
                "--extractor-args",
                "youtube:player_client=android,web",
                &track.url,
            ])
            .await?;

        stdout
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with("http"))
            .map(|url| AudioStream::Url(url.to_string()))
            .ok_or_else(|| {
                MusicError::AudioSourceError(format!("No audio stream found for {}", track.url))
            })
    }
}
