//! Music playback: slash commands, the playback engine behind them, and the
//! helpers that keep Discord messages in step with each guild's queue.

pub mod audio_sources;
pub mod engine;
pub mod utils;

pub(crate) mod back;
pub(crate) mod bassboost;
pub(crate) mod jump;
pub(crate) mod loop_mode;
pub(crate) mod nowplaying;
pub(crate) mod pause;
pub(crate) mod play;
pub(crate) mod queue;
pub(crate) mod resume;
pub(crate) mod seek;
pub(crate) mod shuffle;
pub(crate) mod skip;
pub(crate) mod stop;
pub(crate) mod volume;

use crate::{CommandResult, Context, Data, Error};
use tracing::{debug, info};
use utils::music_manager::{
    ensure_same_channel, enqueue, MusicError, MusicManager, MusicResult,
};

/// Every music slash command, ready for the framework.
pub fn commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        play::play(),
        pause::pause(),
        resume::resume(),
        skip::skip(),
        back::back(),
        stop::stop(),
        seek::seek(),
        volume::volume(),
        loop_mode::loop_mode(),
        shuffle::shuffle(),
        jump::jump(),
        queue::queue(),
        nowplaying::nowplaying(),
        bassboost::bassboost(),
    ]
}
