//! Encore is a Discord music bot: slash commands and buttons drive a per-guild
//! playback queue, a single "now playing" status message is kept in sync with
//! that queue, and ambiguous searches turn into a short multiple-choice prompt.

pub mod commands;
pub mod config;
pub mod events;

use std::sync::Arc;

use commands::music::engine::PlaybackEngine;
use commands::music::utils::{player_messages::PlayerMessages, selection::SelectionSessions};
use config::Config;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

/// State shared by every command invocation and component interaction.
pub struct Data {
    pub config: Arc<Config>,
    pub engine: Arc<dyn PlaybackEngine>,
    pub player_messages: Arc<PlayerMessages>,
    pub selections: Arc<SelectionSessions>,
}
