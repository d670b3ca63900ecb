//! Gateway events the framework does not handle itself: button clicks and
//! voice state changes in channels the bot is playing in.

use ::serenity::all::{ChannelId, FullEvent, GuildId, Interaction, UserId, VoiceState};
use poise::serenity_prelude as serenity;
use std::collections::HashMap;
use tracing::{debug, error};

use crate::commands::music::utils::component_handlers;
use crate::{Data, Error};

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::InteractionCreate {
            interaction: Interaction::Component(component),
        } => {
            if let Err(e) = component_handlers::handle_interaction(ctx, component, data).await {
                error!("Error handling component interaction: {}", e);
            }
        }
        FullEvent::VoiceStateUpdate { old, new } => {
            voice_state_changed(ctx, data, old.as_ref(), new).await;
        }
        _ => {}
    }
    Ok(())
}

/// Tell the guild's queue how many listeners remain when someone joins or
/// leaves the bot's voice channel.
async fn voice_state_changed(
    ctx: &serenity::Context,
    data: &Data,
    old: Option<&VoiceState>,
    new: &VoiceState,
) {
    let Some(guild_id) = new.guild_id else {
        return;
    };
    let Some(queue) = data.engine.queue(guild_id) else {
        return;
    };
    let bot_channel = queue.metadata().voice_channel;

    let touched = old.and_then(|state| state.channel_id) == Some(bot_channel)
        || new.channel_id == Some(bot_channel);
    if !touched {
        return;
    }

    let Some(listeners) = listeners_in(ctx, guild_id, bot_channel) else {
        return;
    };
    debug!(
        "Voice channel {} in guild {} now has {} listener(s)",
        bot_channel, guild_id, listeners
    );
    queue.listeners_changed(listeners).await;
}

fn listeners_in(ctx: &serenity::Context, guild_id: GuildId, channel: ChannelId) -> Option<usize> {
    let bot_id = ctx.cache.current_user().id;
    let guild = ctx.cache.guild(guild_id)?;
    Some(count_listeners(&guild.voice_states, channel, |user_id| {
        user_id == bot_id
            || guild
                .members
                .get(&user_id)
                .is_some_and(|member| member.user.bot)
    }))
}

/// Users connected to `channel`, not counting bots.
pub fn count_listeners(
    voice_states: &HashMap<UserId, VoiceState>,
    channel: ChannelId,
    is_bot: impl Fn(UserId) -> bool,
) -> usize {
    voice_states
        .values()
        .filter(|state| state.channel_id == Some(channel))
        .filter(|state| !is_bot(state.user_id))
        .count()
}
