//! Disambiguation prompts: up to three search candidates offered as buttons,
//! resolved by the requesting user's first valid click, a cancel, or a timeout.

use ::serenity::all::{ChannelId, MessageId, UserId};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::button_controls::ButtonAction;
use super::embedded_messages::MessageView;
use super::messenger::{EditOutcome, Messenger};
use super::music_manager::MusicError;
use crate::commands::music::engine::Track;

pub const MAX_CANDIDATES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Selected(usize),
    Cancelled,
    TimedOut,
}

/// A click on one of a prompt's buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionClick {
    pub user_id: UserId,
    pub action: ButtonAction,
}

/// Where a prompt is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptMessage {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

#[derive(Debug, Clone)]
pub struct SelectionPrompt {
    requesting_user: UserId,
    candidates: Vec<Track>,
    timeout: Duration,
}

impl SelectionPrompt {
    /// Keep the first [`MAX_CANDIDATES`] results in relevance order.
    pub fn open(
        mut candidates: Vec<Track>,
        requesting_user: UserId,
        timeout: Duration,
    ) -> Result<Self, MusicError> {
        if candidates.is_empty() {
            return Err(MusicError::InvalidCandidates);
        }
        candidates.truncate(MAX_CANDIDATES);

        Ok(Self {
            requesting_user,
            candidates,
            timeout,
        })
    }

    pub fn candidates(&self) -> &[Track] {
        &self.candidates
    }

    pub fn candidate(&self, index: usize) -> Option<&Track> {
        self.candidates.get(index)
    }

    /// The resolution a click would cause, or `None` when the click must be
    /// ignored (another user, or an index outside the candidates).
    pub fn accepts(&self, click: &SelectionClick) -> Option<Resolution> {
        if click.user_id != self.requesting_user {
            return None;
        }
        match click.action {
            ButtonAction::SongSelect(index) if index < self.candidates.len() => {
                Some(Resolution::Selected(index))
            }
            ButtonAction::SongSelectCancel => Some(Resolution::Cancelled),
            _ => None,
        }
    }
}

/// Live prompts keyed by the message they are attached to.
pub struct SelectionSessions {
    messenger: Arc<dyn Messenger>,
    live: DashMap<MessageId, mpsc::UnboundedSender<SelectionClick>>,
}

impl SelectionSessions {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self {
            messenger,
            live: DashMap::new(),
        }
    }

    pub fn is_live(&self, message_id: MessageId) -> bool {
        self.live.contains_key(&message_id)
    }

    /// Hand a click to the prompt on `message_id`. Returns `false` when no
    /// prompt is waiting there (already resolved, expired, or never existed).
    pub fn offer(&self, message_id: MessageId, click: SelectionClick) -> bool {
        match self.live.get(&message_id) {
            Some(sender) => sender.send(click).is_ok(),
            None => false,
        }
    }

    /// Wait for the prompt on `message` to resolve. Only the first accepted
    /// click counts; the prompt is unregistered before this returns, so later
    /// clicks are never seen. Cancellation and expiry edit the prompt into a
    /// notice here; a selection is left for the caller to confirm.
    pub async fn run(&self, message: PromptMessage, prompt: &SelectionPrompt) -> Resolution {
        let (sender, mut clicks) = mpsc::unbounded_channel();
        self.live.insert(message.message_id, sender);

        let deadline = tokio::time::sleep(prompt.timeout);
        tokio::pin!(deadline);

        let resolution = loop {
            tokio::select! {
                _ = &mut deadline => break Resolution::TimedOut,
                click = clicks.recv() => match click {
                    Some(click) => match prompt.accepts(&click) {
                        Some(resolution) => break resolution,
                        None => debug!(
                            "Ignoring {} from {} on prompt {}",
                            click.action, click.user_id, message.message_id
                        ),
                    },
                    None => break Resolution::TimedOut,
                },
            }
        };

        self.live.remove(&message.message_id);
        info!(
            "Selection prompt {} resolved: {:?}",
            message.message_id, resolution
        );

        match resolution {
            Resolution::TimedOut => {
                self.conclude(message, MessageView::text("⏱️ Selection timed out."))
                    .await
            }
            Resolution::Cancelled => {
                self.conclude(message, MessageView::text("❌ Selection cancelled."))
                    .await
            }
            Resolution::Selected(_) => {}
        }

        resolution
    }

    /// Replace the prompt with a plain notice. Best effort: the prompt may
    /// already be gone.
    pub async fn conclude(&self, message: PromptMessage, notice: MessageView) {
        match self
            .messenger
            .edit(message.channel_id, message.message_id, notice.without_controls())
            .await
        {
            Ok(EditOutcome::Edited) => {}
            Ok(EditOutcome::Missing) => debug!(
                "Selection prompt {} was deleted before it could be closed",
                message.message_id
            ),
            Err(err) => warn!(
                "Failed to close selection prompt {}: {}",
                message.message_id, err
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::music::utils::messenger::MockMessenger;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    const REQUESTER: u64 = 10;
    const STRANGER: u64 = 20;
    const TIMEOUT: Duration = Duration::from_secs(30);

    fn candidate(n: usize) -> Track {
        Track {
            title: format!("Candidate {}", n),
            author: "Someone".to_string(),
            url: format!("https://www.youtube.com/watch?v=c{}", n),
            duration: Some(Duration::from_secs(180)),
            views: Some(1000),
            thumbnail: None,
            requested_by: Some(UserId::new(REQUESTER)),
            source: "yt-dlp".to_string(),
        }
    }

    fn prompt(count: usize) -> SelectionPrompt {
        SelectionPrompt::open(
            (0..count).map(candidate).collect(),
            UserId::new(REQUESTER),
            TIMEOUT,
        ).unwrap()
    }

    fn message() -> PromptMessage {
        PromptMessage {
            channel_id: ChannelId::new(1),
            message_id: MessageId::new(2),
        }
    }

    fn click(user: u64, action: ButtonAction) -> SelectionClick {
        SelectionClick {
            user_id: UserId::new(user),
            action,
        }
    }

    async fn wait_until_live(sessions: &SelectionSessions, message_id: MessageId) {
        while !sessions.is_live(message_id) {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_open_rejects_empty_candidates() {
        assert_matches!(
            SelectionPrompt::open(Vec::new(), UserId::new(REQUESTER), TIMEOUT),
            Err(MusicError::InvalidCandidates)
        );
    }

    #[test]
    fn test_open_keeps_top_three() {
        let prompt = prompt(5);
        let titles: Vec<_> = prompt.candidates().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Candidate 0", "Candidate 1", "Candidate 2"]);
    }

    #[test]
    fn test_accepts_only_requester_and_valid_ids() {
        let prompt = prompt(2);

        assert_eq!(
            prompt.accepts(&click(REQUESTER, ButtonAction::SongSelect(1))),
            Some(Resolution::Selected(1))
        );
        assert_eq!(
            prompt.accepts(&click(REQUESTER, ButtonAction::SongSelectCancel)),
            Some(Resolution::Cancelled)
        );
        assert_eq!(
            prompt.accepts(&click(STRANGER, ButtonAction::SongSelect(0))),
            None
        );
        assert_eq!(
            prompt.accepts(&click(REQUESTER, ButtonAction::SongSelect(2))),
            None
        );
        assert_eq!(prompt.accepts(&click(REQUESTER, ButtonAction::Pause)), None);
    }

    /// A stranger's click is ignored, the requester's first click wins, and
    /// anything after that never reaches the prompt.
    #[tokio::test(start_paused = true)]
    async fn test_first_valid_click_wins() {
        let mut messenger = MockMessenger::new();
        messenger.expect_edit().never();
        let sessions = Arc::new(SelectionSessions::new(Arc::new(messenger)));

        let runner = {
            let sessions = Arc::clone(&sessions);
            tokio::spawn(async move { sessions.run(message(), &prompt(3)).await })
        };
        wait_until_live(&sessions, message().message_id).await;

        assert!(sessions.offer(
            message().message_id,
            click(STRANGER, ButtonAction::SongSelect(0))
        ));
        assert!(sessions.offer(
            message().message_id,
            click(REQUESTER, ButtonAction::SongSelect(2))
        ));
        sessions.offer(
            message().message_id,
            click(REQUESTER, ButtonAction::SongSelectCancel),
        );

        assert_eq!(runner.await.unwrap(), Resolution::Selected(2));
        assert!(!sessions.offer(
            message().message_id,
            click(REQUESTER, ButtonAction::SongSelect(0))
        ));
    }

    /// With no clicks the prompt expires exactly once and loses its buttons.
    #[tokio::test(start_paused = true)]
    async fn test_timeout_strips_controls_once() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_edit()
            .withf(|channel, id, view| {
                *channel == ChannelId::new(1)
                    && *id == MessageId::new(2)
                    && view.rows.is_empty()
                    && view.content.as_deref() == Some("⏱️ Selection timed out.")
            })
            .times(1)
            .returning(|_, _, _| Ok(EditOutcome::Edited));
        let sessions = SelectionSessions::new(Arc::new(messenger));

        let resolution = sessions.run(message(), &prompt(2)).await;

        assert_eq!(resolution, Resolution::TimedOut);
        assert!(!sessions.is_live(message().message_id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_edits_prompt() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_edit()
            .withf(|_, _, view| view.content.as_deref() == Some("❌ Selection cancelled."))
            .times(1)
            .returning(|_, _, _| Ok(EditOutcome::Edited));
        let sessions = Arc::new(SelectionSessions::new(Arc::new(messenger)));

        let runner = {
            let sessions = Arc::clone(&sessions);
            tokio::spawn(async move { sessions.run(message(), &prompt(1)).await })
        };
        wait_until_live(&sessions, message().message_id).await;
        sessions.offer(
            message().message_id,
            click(REQUESTER, ButtonAction::SongSelectCancel),
        );

        assert_eq!(runner.await.unwrap(), Resolution::Cancelled);
    }

    /// A deleted prompt does not turn the timeout into an error.
    #[tokio::test(start_paused = true)]
    async fn test_timeout_on_deleted_prompt_is_swallowed() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_edit()
            .times(1)
            .returning(|_, _, _| Ok(EditOutcome::Missing));
        let sessions = SelectionSessions::new(Arc::new(messenger));

        assert_eq!(
            sessions.run(message(), &prompt(1)).await,
            Resolution::TimedOut
        );
    }
}
