//! Runtime configuration read from the process environment (optionally seeded
//! from a `.env` file by `dotenv`).

use poise::serenity_prelude::GuildId;
use std::time::Duration;

use crate::commands::music::utils::music_manager::MusicError;

const DEFAULT_VOLUME: u8 = 50;
const DEFAULT_SELECTION_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_LEAVE_COOLDOWN: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub discord_token: String,
    /// Register commands to this guild only (instant updates while developing).
    pub guild_id: Option<GuildId>,
    pub default_volume: u8,
    pub selection_timeout: Duration,
    pub leave_on_empty_cooldown: Duration,
    pub leave_on_end_cooldown: Duration,
    pub ytdlp_path: String,
    pub ffmpeg_path: String,
}

impl Config {
    /// Load the configuration from environment variables.
    pub fn from_env() -> Result<Self, MusicError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MusicError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| MusicError::ConfigError("Missing DISCORD_TOKEN".to_string()))?;

        let guild_id = match lookup("DISCORD_GUILD_ID") {
            Some(raw) => match parse_number::<u64>("DISCORD_GUILD_ID", &raw)? {
                0 => {
                    return Err(MusicError::ConfigError(
                        "DISCORD_GUILD_ID must not be zero".to_string(),
                    ));
                }
                id => Some(GuildId::new(id)),
            },
            None => None,
        };

        let default_volume = match lookup("DEFAULT_VOLUME") {
            Some(raw) => {
                let volume = parse_number::<u8>("DEFAULT_VOLUME", &raw)?;
                if volume > 100 {
                    return Err(MusicError::ConfigError(format!(
                        "DEFAULT_VOLUME must be between 0 and 100, got {}",
                        volume
                    )));
                }
                volume
            }
            None => DEFAULT_VOLUME,
        };

        Ok(Self {
            discord_token,
            guild_id,
            default_volume,
            selection_timeout: duration_or(
                &lookup,
                "SELECTION_TIMEOUT",
                DEFAULT_SELECTION_TIMEOUT,
            )?,
            leave_on_empty_cooldown: duration_or(
                &lookup,
                "LEAVE_ON_EMPTY_COOLDOWN",
                DEFAULT_LEAVE_COOLDOWN,
            )?,
            leave_on_end_cooldown: duration_or(
                &lookup,
                "LEAVE_ON_END_COOLDOWN",
                DEFAULT_LEAVE_COOLDOWN,
            )?,
            ytdlp_path: lookup("YTDLP_PATH").unwrap_or_else(|| "yt-dlp".to_string()),
            ffmpeg_path: lookup("FFMPEG_PATH").unwrap_or_else(|| "ffmpeg".to_string()),
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, MusicError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| MusicError::ConfigError(format!("{} is not a valid number: {}", key, raw)))
}

fn duration_or<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, MusicError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => humantime::parse_duration(raw.trim()).map_err(|e| {
            MusicError::ConfigError(format!("{} is not a valid duration ({}): {}", key, raw, e))
        }),
        None => Ok(default),
    }
}
