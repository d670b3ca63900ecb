//! Sample ids and tracks.

use encore::commands::music::engine::{QueueMetadata, Track};
use fake::Fake;
use fake::faker::lorem::en::Words;
use fake::faker::name::en::Name;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, UserId};
use std::time::Duration;

pub const GUILD_ID: u64 = 111_111_111;
pub const OTHER_GUILD_ID: u64 = 222_222_222;
pub const TEXT_CHANNEL_ID: u64 = 987_654_321;
pub const VOICE_CHANNEL_ID: u64 = 876_543_210;
pub const USER_ID: u64 = 123_456_789;
pub const OTHER_USER_ID: u64 = 234_567_890;

pub fn guild() -> GuildId {
    GuildId::new(GUILD_ID)
}

pub fn other_guild() -> GuildId {
    GuildId::new(OTHER_GUILD_ID)
}

pub fn text_channel() -> ChannelId {
    ChannelId::new(TEXT_CHANNEL_ID)
}

pub fn user() -> UserId {
    UserId::new(USER_ID)
}

pub fn message(id: u64) -> MessageId {
    MessageId::new(id)
}

pub fn metadata() -> QueueMetadata {
    QueueMetadata {
        text_channel: text_channel(),
        voice_channel: ChannelId::new(VOICE_CHANNEL_ID),
    }
}

/// A track with a predictable title, "Track {n}".
pub fn track(n: usize) -> Track {
    Track {
        title: format!("Track {}", n),
        author: Name().fake(),
        url: format!("https://www.youtube.com/watch?v=track{}", n),
        duration: Some(Duration::from_secs((90..600u64).fake())),
        views: Some((1_000..10_000_000u64).fake()),
        thumbnail: None,
        requested_by: Some(user()),
        source: "yt-dlp".to_string(),
    }
}

pub fn tracks(range: std::ops::RangeInclusive<usize>) -> Vec<Track> {
    range.map(track).collect()
}

/// A track with a generated title.
pub fn random_track() -> Track {
    let words: Vec<String> = Words(2..5).fake();
    Track {
        title: words.join(" "),
        ..track(0)
    }
}
