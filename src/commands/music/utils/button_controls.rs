use serenity::all::{ButtonStyle, CreateActionRow, CreateButton, ReactionType};
use std::fmt;
use std::str::FromStr;

use crate::commands::music::engine::PlayerSnapshot;

/// Upcoming tracks shown per queue page.
pub const QUEUE_PAGE_SIZE: usize = 5;

/// Every button the bot renders, decoded once from the component's custom id.
///
/// Ids only carry small integers, so they stay valid across restarts:
/// `player_<verb>`, `queue_page_<n>`, `queue_remove_<index>`,
/// `queue_clear_all`, `song_select_<index>` and `song_select_cancel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonAction {
    Pause,
    Skip,
    Stop,
    Shuffle,
    Loop,
    ShowQueue,
    QueuePage(usize),
    QueueRemove(usize),
    QueueClearAll,
    SongSelect(usize),
    SongSelectCancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownButton(pub String);

impl fmt::Display for UnknownButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown button id `{}`", self.0)
    }
}

impl std::error::Error for UnknownButton {}

impl ButtonAction {
    /// Clicks that belong to a selection prompt rather than a guild queue.
    pub fn is_selection(self) -> bool {
        matches!(
            self,
            ButtonAction::SongSelect(_) | ButtonAction::SongSelectCancel
        )
    }
}

impl FromStr for ButtonAction {
    type Err = UnknownButton;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        let action = match id {
            "player_pause" => Some(ButtonAction::Pause),
            "player_skip" => Some(ButtonAction::Skip),
            "player_stop" => Some(ButtonAction::Stop),
            "player_shuffle" => Some(ButtonAction::Shuffle),
            "player_loop" => Some(ButtonAction::Loop),
            "player_queue" => Some(ButtonAction::ShowQueue),
            "queue_clear_all" => Some(ButtonAction::QueueClearAll),
            "song_select_cancel" => Some(ButtonAction::SongSelectCancel),
            _ => indexed(id, "queue_page_")
                .map(ButtonAction::QueuePage)
                .or_else(|| indexed(id, "queue_remove_").map(ButtonAction::QueueRemove))
                .or_else(|| indexed(id, "song_select_").map(ButtonAction::SongSelect)),
        };

        action.ok_or_else(|| UnknownButton(id.to_string()))
    }
}

fn indexed(id: &str, prefix: &str) -> Option<usize> {
    let digits = id.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl fmt::Display for ButtonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ButtonAction::Pause => f.write_str("player_pause"),
            ButtonAction::Skip => f.write_str("player_skip"),
            ButtonAction::Stop => f.write_str("player_stop"),
            ButtonAction::Shuffle => f.write_str("player_shuffle"),
            ButtonAction::Loop => f.write_str("player_loop"),
            ButtonAction::ShowQueue => f.write_str("player_queue"),
            ButtonAction::QueuePage(page) => write!(f, "queue_page_{}", page),
            ButtonAction::QueueRemove(index) => write!(f, "queue_remove_{}", index),
            ButtonAction::QueueClearAll => f.write_str("queue_clear_all"),
            ButtonAction::SongSelect(index) => write!(f, "song_select_{}", index),
            ButtonAction::SongSelectCancel => f.write_str("song_select_cancel"),
        }
    }
}

/// A button as rendered, kept as plain data so views can be compared in tests
/// and turned into serenity builders at the edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub action: ButtonAction,
    pub label: String,
    pub emoji: Option<&'static str>,
    pub style: ButtonStyle,
    pub disabled: bool,
}

impl Control {
    fn new(action: ButtonAction, label: impl Into<String>, style: ButtonStyle) -> Self {
        Self {
            action,
            label: label.into(),
            emoji: None,
            style,
            disabled: false,
        }
    }

    fn emoji(mut self, emoji: &'static str) -> Self {
        self.emoji = Some(emoji);
        self
    }

    fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

impl From<&Control> for CreateButton {
    fn from(control: &Control) -> Self {
        let mut button = CreateButton::new(control.action.to_string())
            .label(control.label.clone())
            .style(control.style)
            .disabled(control.disabled);
        if let Some(emoji) = control.emoji {
            button = button.emoji(ReactionType::Unicode(emoji.to_string()));
        }
        button
    }
}

pub type ControlRows = Vec<Vec<Control>>;

pub fn to_action_rows(rows: &[Vec<Control>]) -> Vec<CreateActionRow> {
    rows.iter()
        .filter(|row| !row.is_empty())
        .map(|row| CreateActionRow::Buttons(row.iter().map(CreateButton::from).collect()))
        .collect()
}

/// Transport controls for the status message, rendered from live state.
pub fn player_controls(snapshot: &PlayerSnapshot) -> ControlRows {
    let nothing_upcoming = snapshot.upcoming == 0;

    let pause = if snapshot.paused {
        Control::new(ButtonAction::Pause, "Resume", ButtonStyle::Primary).emoji("▶️")
    } else {
        Control::new(ButtonAction::Pause, "Pause", ButtonStyle::Primary).emoji("⏸️")
    };

    let skip = Control::new(ButtonAction::Skip, "Skip", ButtonStyle::Primary)
        .emoji("⏭️")
        .disabled(nothing_upcoming);
    let stop = Control::new(ButtonAction::Stop, "Stop", ButtonStyle::Danger).emoji("⏹️");

    let shuffle = Control::new(ButtonAction::Shuffle, "Shuffle", ButtonStyle::Secondary)
        .emoji("🔀")
        .disabled(nothing_upcoming);
    let repeat =
        Control::new(ButtonAction::Loop, snapshot.repeat.label(), ButtonStyle::Secondary).emoji("🔁");
    let queue = Control::new(ButtonAction::ShowQueue, "View Queue", ButtonStyle::Secondary).emoji("📋");

    vec![vec![pause, skip, stop], vec![shuffle, repeat, queue]]
}

/// Per-row removal buttons for one queue page plus pagination and clear.
pub fn queue_controls(page: usize, total_pages: usize, upcoming: usize) -> ControlRows {
    let mut rows = Vec::new();

    if upcoming > 0 {
        let start = page * QUEUE_PAGE_SIZE;
        let end = (start + QUEUE_PAGE_SIZE).min(upcoming);
        let removes = (start..end)
            .map(|index| {
                Control::new(
                    ButtonAction::QueueRemove(index),
                    (index + 1).to_string(),
                    ButtonStyle::Danger,
                )
                .emoji("❌")
            })
            .collect::<Vec<_>>();
        rows.push(removes);
    }

    let mut navigation = Vec::new();
    if total_pages > 1 {
        navigation.push(
            Control::new(
                ButtonAction::QueuePage(page.saturating_sub(1)),
                "Previous",
                ButtonStyle::Secondary,
            )
            .emoji("◀️")
            .disabled(page == 0),
        );
        navigation.push(
            Control::new(
                ButtonAction::QueuePage(page + 1),
                "Next",
                ButtonStyle::Secondary,
            )
            .emoji("▶️")
            .disabled(page + 1 >= total_pages),
        );
    }
    if upcoming > 0 {
        navigation.push(
            Control::new(ButtonAction::QueueClearAll, "Clear Queue", ButtonStyle::Danger).emoji("🗑️"),
        );
    }
    if !navigation.is_empty() {
        rows.push(navigation);
    }

    rows
}

/// Numbered choices plus cancel for a selection prompt.
pub fn selection_controls(candidates: usize) -> ControlRows {
    let mut row = (0..candidates)
        .map(|index| {
            Control::new(
                ButtonAction::SongSelect(index),
                (index + 1).to_string(),
                ButtonStyle::Primary,
            )
        })
        .collect::<Vec<_>>();
    row.push(Control::new(
        ButtonAction::SongSelectCancel,
        "Cancel",
        ButtonStyle::Secondary,
    ));
    vec![row]
}
