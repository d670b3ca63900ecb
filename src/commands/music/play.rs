use super::*;
use audio_sources::QueryType;
use engine::{QueueMetadata, SearchResult, Track};
use utils::embedded_messages;
use utils::music_manager::{enqueue_confirmation, enqueue_selection};
use utils::selection::{PromptMessage, SelectionPrompt};

/// Play a song from YouTube or a direct URL
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn play(
    ctx: Context<'_>,
    #[description = "URL or search query"] query: String,
) -> CommandResult {
    info!("Received play command with query: {}", query);
    if let Err(err) = join_target(ctx) {
        return MusicManager::respond(ctx, Err(err)).await;
    }

    // Searching can take a few seconds. From here on every reply is public.
    ctx.defer().await?;

    let results = match ctx.data().engine.search(&query, ctx.author().id).await {
        Ok(results) if results.is_empty() => Err(MusicError::NoResults),
        other => other,
    };
    let results = match results {
        Ok(results) => results,
        Err(err) => return MusicManager::respond_deferred(ctx, Err(err)).await,
    };

    if needs_selection(&query, &results) {
        return choose_and_enqueue(ctx, &query, results.tracks).await;
    }

    // Voice and queue state may have moved on while searching.
    let outcome = match join_target(ctx) {
        Ok(metadata) => enqueue_results(ctx, metadata, results).await,
        Err(err) => Err(err),
    };
    MusicManager::respond_deferred(ctx, outcome).await
}

/// The caller's voice channel, checked against any existing queue and the
/// bot's permissions there.
fn join_target(ctx: Context<'_>) -> MusicResult<QueueMetadata> {
    let guild_id = MusicManager::guild_id(ctx)?;
    let voice_channel = MusicManager::get_user_voice_channel(ctx, guild_id, ctx.author().id)?;

    if let Some(queue) = ctx.data().engine.queue(guild_id) {
        ensure_same_channel(voice_channel, &queue.metadata())?;
    }
    if !MusicManager::bot_can_speak_in(ctx, guild_id, voice_channel) {
        return Err(MusicError::MissingVoicePermissions);
    }

    Ok(QueueMetadata {
        text_channel: ctx.channel_id(),
        voice_channel,
    })
}

/// Free-text searches with more than one plain hit let the user pick.
pub fn needs_selection(query: &str, results: &SearchResult) -> bool {
    !QueryType::resolve(query).is_url() && results.playlist.is_none() && results.tracks.len() > 1
}

async fn enqueue_results(
    ctx: Context<'_>,
    metadata: QueueMetadata,
    results: SearchResult,
) -> MusicResult<String> {
    let guild_id = MusicManager::guild_id(ctx)?;
    let engine = ctx.data().engine.as_ref();

    match results.playlist {
        Some(playlist) => {
            let count = results.tracks.len();
            enqueue(engine, guild_id, metadata, results.tracks).await?;
            Ok(format!(
                "✅ Added **{}** tracks from playlist: **{}**",
                count, playlist.title
            ))
        }
        None => {
            let track = results
                .tracks
                .into_iter()
                .next()
                .ok_or(MusicError::NoResults)?;
            let outcome = enqueue(engine, guild_id, metadata, vec![track.clone()]).await?;
            Ok(enqueue_confirmation(&track, outcome))
        }
    }
}

async fn choose_and_enqueue(ctx: Context<'_>, query: &str, candidates: Vec<Track>) -> CommandResult {
    let data = ctx.data();
    let guild_id = MusicManager::guild_id(ctx)?;
    let prompt = match SelectionPrompt::open(
        candidates,
        ctx.author().id,
        data.config.selection_timeout,
    ) {
        Ok(prompt) => prompt,
        Err(err) => return MusicManager::respond_deferred(ctx, Err(err)).await,
    };

    let view = embedded_messages::selection_prompt(query, prompt.candidates());
    let reply = ctx.send(view.to_reply(false)).await?;
    let message = reply.message().await?;
    let prompt_message = PromptMessage {
        channel_id: message.channel_id,
        message_id: message.id,
    };

    let resolution =
        enqueue_selection(data, guild_id, prompt_message, &prompt, || join_target(ctx)).await;
    debug!("Selection for '{}' ended: {:?}", query, resolution);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::Playlist;
    use rstest::rstest;

    fn track(n: usize) -> Track {
        Track {
            title: format!("Song {}", n),
            author: "Artist".to_string(),
            url: format!("https://www.youtube.com/watch?v={}", n),
            duration: None,
            views: None,
            thumbnail: None,
            requested_by: None,
            source: "yt-dlp".to_string(),
        }
    }

    fn results(count: usize, playlist: bool) -> SearchResult {
        SearchResult {
            tracks: (0..count).map(track).collect(),
            playlist: playlist.then(|| Playlist {
                title: "Mix".to_string(),
                url: "https://www.youtube.com/playlist?list=PL1".to_string(),
            }),
        }
    }

    #[rstest]
    #[case("never gonna give you up", 3, false, true)]
    #[case("never gonna give you up", 1, false, false)]
    #[case("https://www.youtube.com/watch?v=1", 3, false, false)]
    #[case("https://www.youtube.com/playlist?list=PL1", 3, true, false)]
    fn test_needs_selection(
        #[case] query: &str,
        #[case] count: usize,
        #[case] playlist: bool,
        #[case] expected: bool,
    ) {
        assert_eq!(needs_selection(query, &results(count, playlist)), expected);
    }
}
