//! Keeps exactly one "now playing" status message per guild in step with the
//! engine. The registry below is written by this module only; commands, the
//! button router and the event bridge ask for a publish or refresh instead of
//! touching the message themselves.

use ::serenity::all::{ChannelId, GuildId, MessageId};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::embedded_messages::{self, MessageView};
use super::messenger::{EditOutcome, Messenger};
use super::music_manager::MusicError;
use crate::commands::music::engine::{PlaybackEngine, PlayerSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMessageRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// A registry entry, always replaced as a whole.
#[derive(Debug, Clone)]
struct StatusMessage {
    reference: StatusMessageRef,
    view: MessageView,
}

/// Each guild gets its own slot. The slot's lock serialises renders for that
/// guild only, so two rapid state changes cannot both decide to post.
type Slot = Arc<Mutex<Option<StatusMessage>>>;

pub struct PlayerMessages {
    engine: Arc<dyn PlaybackEngine>,
    messenger: Arc<dyn Messenger>,
    registry: DashMap<GuildId, Slot>,
}

impl PlayerMessages {
    pub fn new(engine: Arc<dyn PlaybackEngine>, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            engine,
            messenger,
            registry: DashMap::new(),
        }
    }

    fn slot(&self, guild_id: GuildId) -> Slot {
        Arc::clone(self.registry.entry(guild_id).or_default().value())
    }

    fn existing_slot(&self, guild_id: GuildId) -> Option<Slot> {
        self.registry
            .get(&guild_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// The message currently tracked for `guild_id`.
    pub async fn tracked(&self, guild_id: GuildId) -> Option<StatusMessageRef> {
        let slot = self.existing_slot(guild_id)?;
        let current = slot.lock().await;
        current.as_ref().map(|status| status.reference)
    }

    /// Render `snapshot` into the guild's status message. Edits the tracked
    /// message in place when it lives in `channel_id`; otherwise, or when the
    /// edit fails, posts a new message and tracks that one instead.
    pub async fn publish(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        snapshot: &PlayerSnapshot,
    ) -> Result<StatusMessageRef, MusicError> {
        let view = embedded_messages::player_panel(snapshot);
        let slot = self.slot(guild_id);
        let mut current = slot.lock().await;

        if let Some(existing) = current.as_ref().map(|status| status.reference) {
            if existing.channel_id == channel_id {
                match self
                    .messenger
                    .edit(channel_id, existing.message_id, view.clone())
                    .await
                {
                    Ok(EditOutcome::Edited) => {
                        debug!("Updated status message for guild {}", guild_id);
                        *current = Some(StatusMessage {
                            reference: existing,
                            view,
                        });
                        return Ok(existing);
                    }
                    Ok(EditOutcome::Missing) => {
                        info!(
                            "Status message for guild {} was deleted, sending a new one",
                            guild_id
                        );
                    }
                    Err(err) => {
                        warn!(
                            "Failed to update status message for guild {}, sending a new one: {}",
                            guild_id, err
                        );
                    }
                }
            }
        }

        let message_id = self.messenger.send(channel_id, view.clone()).await?;
        let reference = StatusMessageRef {
            channel_id,
            message_id,
        };
        *current = Some(StatusMessage { reference, view });
        debug!("Tracking status message {} for guild {}", message_id, guild_id);

        Ok(reference)
    }

    /// Re-render the tracked message from live engine state. Never posts a
    /// new message; a vanished message is forgotten so the next publish
    /// starts fresh.
    pub async fn refresh(&self, guild_id: GuildId) -> Result<(), MusicError> {
        let Some(slot) = self.existing_slot(guild_id) else {
            return Ok(());
        };
        let mut current = slot.lock().await;
        let Some(existing) = current.as_ref().map(|status| status.reference) else {
            return Ok(());
        };
        let Some(queue) = self.engine.queue(guild_id) else {
            return Ok(());
        };
        let Some(snapshot) = PlayerSnapshot::capture(queue.as_ref()).await else {
            return Ok(());
        };

        let view = embedded_messages::player_panel(&snapshot);
        match self
            .messenger
            .edit(existing.channel_id, existing.message_id, view.clone())
            .await?
        {
            EditOutcome::Edited => {
                *current = Some(StatusMessage {
                    reference: existing,
                    view,
                });
            }
            EditOutcome::Missing => {
                debug!(
                    "Status message for guild {} disappeared, forgetting it",
                    guild_id
                );
                *current = None;
            }
        }

        Ok(())
    }

    /// Forget the guild's status message, stripping its buttons first so the
    /// leftover message cannot drive a queue that no longer exists.
    pub async fn retire(&self, guild_id: GuildId) {
        let Some((_, slot)) = self.registry.remove(&guild_id) else {
            return;
        };
        let Some(status) = slot.lock().await.take() else {
            return;
        };

        let reference = status.reference;
        match self
            .messenger
            .edit(
                reference.channel_id,
                reference.message_id,
                status.view.without_controls(),
            )
            .await
        {
            Ok(_) => debug!("Retired status message for guild {}", guild_id),
            Err(err) => warn!(
                "Failed to strip controls from status message for guild {}: {}",
                guild_id, err
            ),
        }
    }
}
