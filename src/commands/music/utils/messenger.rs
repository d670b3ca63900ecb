//! The seam between the interactive layer and Discord's message endpoints.
//! Everything that posts or edits bot-owned messages outside an interaction
//! response goes through [`Messenger`], so the reconciler and selection
//! sessions can be exercised without a gateway connection.

use ::serenity::all::{ChannelId, Http, HttpError, MessageId};
use serenity::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::embedded_messages::MessageView;
use super::music_manager::MusicError;

/// Discord's "Unknown Message" and "Unknown Channel" JSON error codes.
const UNKNOWN_MESSAGE: isize = 10008;
const UNKNOWN_CHANNEL: isize = 10003;

/// Result of editing a message that may have been deleted out-of-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Edited,
    /// The target no longer exists. Callers recover instead of failing.
    Missing,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, channel_id: ChannelId, view: MessageView) -> Result<MessageId, MusicError>;

    async fn edit(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        view: MessageView,
    ) -> Result<EditOutcome, MusicError>;
}

/// [`Messenger`] backed by the bot's REST client.
pub struct DiscordMessenger {
    http: Arc<Http>,
}

impl DiscordMessenger {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Messenger for DiscordMessenger {
    async fn send(&self, channel_id: ChannelId, view: MessageView) -> Result<MessageId, MusicError> {
        let message = channel_id
            .send_message(&self.http, view.to_create_message())
            .await?;
        Ok(message.id)
    }

    async fn edit(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        view: MessageView,
    ) -> Result<EditOutcome, MusicError> {
        match channel_id
            .edit_message(&self.http, message_id, view.to_edit_message())
            .await
        {
            Ok(_) => Ok(EditOutcome::Edited),
            Err(err) if is_missing_target(&err) => {
                debug!(
                    "Message {} in channel {} is gone: {}",
                    message_id, channel_id, err
                );
                Ok(EditOutcome::Missing)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Whether a failed request means the message or its channel was deleted.
fn is_missing_target(err: &::serenity::Error) -> bool {
    match err {
        ::serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => {
            response.status_code.as_u16() == 404
                || matches!(response.error.code, UNKNOWN_MESSAGE | UNKNOWN_CHANNEL)
        }
        _ => false,
    }
}
