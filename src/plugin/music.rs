//! Local music playback: shuffles a folder of audio files into the caller's voice channel and
//! names the channel after whatever is playing.

use crate::{
    event::*,
    log_error, log_internal,
    logging::{AsyncPrintColor, PrintColor},
    member::{MemberView, ServerMember},
    plugin::*,
};
use anyhow::{anyhow, Result};
use rand::seq::SliceRandom;
use serenity::all::{ChannelId, EditChannel, GuildId, Http, Message};
use songbird::{
    events::{Event as VoiceEvent, EventContext, EventHandler as VoiceEventHandler, TrackEvent},
    input::File,
    Songbird,
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

const AUDIO_EXTENSIONS: [&str; 5] = ["mp3", "wav", "opus", "flac", "m4a"];
/// Discord's limit on channel names.
const CHANNEL_NAME_LIMIT: usize = 100;

const NOT_IN_VOICE: &str = "You must be in a voice channel to use this command!";

/// `randommusic`, `skip` and `stop`.
pub struct Music;

#[serenity::async_trait]
impl Plugin for Music {
    fn name(&self) -> &'static str {
        "music"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let mut lines = Vec::new();
        for (name, description) in [
            ("randommusic", "shuffle local music into your voice channel"),
            ("skip", "skip the current song"),
            ("stop", "stop playback and disconnect"),
        ] {
            lines.push(usage_line(ctx, name, description).await);
        }
        Some(lines.join("\n"))
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        if let Some((msg, _)) = event.is_bot_cmd(ctx, "randommusic").await {
            random_music(ctx, msg).await?;
        } else if let Some((msg, _)) = event.is_bot_cmd(ctx, "skip").await {
            skip(ctx, msg).await?;
        } else if let Some((msg, _)) = event.is_bot_cmd(ctx, "stop").await {
            stop(ctx, msg).await?;
        } else {
            return Ok(EventHandled::No);
        }
        Ok(EventHandled::Yes)
    }
}

/// Renames the voice channel whenever a track starts.
struct NowPlaying {
    http: Arc<Http>,
    channel_id: ChannelId,
    song: String,
}

#[serenity::async_trait]
impl VoiceEventHandler for NowPlaying {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        log_internal!("Now playing `{}`", self.song);
        rename_channel(&self.http, self.channel_id, Some(&self.song)).await;
        None
    }
}

async fn songbird(ctx: &Context<'_>) -> Result<Arc<Songbird>> {
    songbird::get(ctx.cache_http)
        .await
        .ok_or(anyhow!("Songbird voice client is not registered"))
}

async fn random_music(ctx: &Context<'_>, msg: &Message) -> Result<()> {
    let Some(guild_id) = msg.guild_id else {
        msg.reply(ctx.cache_http, NOT_IN_VOICE).await?;
        return Ok(());
    };
    let member = ServerMember::fetch(ctx, guild_id, msg.author.id).await?;
    let Some(channel_id) = member.voice_channel() else {
        msg.reply(ctx.cache_http, NOT_IN_VOICE).await?;
        return Ok(());
    };

    let folder = ctx.cfg.read().await.music.folder.clone();
    let Some(folder) = folder.filter(|folder| folder.is_dir()) else {
        msg.reply(ctx.cache_http, "Music folder not found.").await?;
        return Ok(());
    };

    let mut files = audio_files(&folder).await;
    if files.is_empty() {
        msg.reply(ctx.cache_http, "No audio files found.").await?;
        return Ok(());
    }
    files.shuffle(&mut rand::thread_rng());

    let manager = songbird(ctx).await?;
    let call = manager
        .join(guild_id, channel_id)
        .await
        .map_err(|e| anyhow!("Could not join {}: {}", channel_id, e))?;
    ctx.vstate
        .write()
        .await
        .music_sessions
        .insert(guild_id, channel_id);
    log_internal!(
        "{} started music in {} from `{}`",
        member.member.color(),
        channel_id.color(ctx.http).await,
        folder.to_string_lossy()
    );

    // An already running playlist keeps going; only an empty queue gets refilled.
    let first = {
        let mut handler = call.lock().await;
        if handler.queue().is_empty() {
            let mut first = None;
            for path in &files {
                let song = display_name(&path.to_string_lossy());
                let track = handler.enqueue_input(File::new(path.clone()).into()).await;
                let now_playing = NowPlaying {
                    http: ctx.http.clone(),
                    channel_id,
                    song: song.clone(),
                };
                if let Err(err) =
                    track.add_event(VoiceEvent::Track(TrackEvent::Play), now_playing)
                {
                    log_error!("Could not watch track `{}`: {}", song, err);
                }
                first.get_or_insert(song);
            }
            first
        } else {
            None
        }
    };

    let reply = match first {
        Some(song) => format!("Now playing: {}", song),
        None => "Music is already playing. Use skip for the next song.".to_owned(),
    };
    msg.reply(ctx.cache_http, reply).await?;
    Ok(())
}

async fn skip(ctx: &Context<'_>, msg: &Message) -> Result<()> {
    let call = match msg.guild_id {
        Some(guild_id) => songbird(ctx).await?.get(guild_id),
        None => None,
    };
    let skipped = match call {
        Some(call) => {
            let handler = call.lock().await;
            handler.queue().current().is_some() && handler.queue().skip().is_ok()
        }
        None => false,
    };

    let reply = if skipped {
        "Skipped the song!"
    } else {
        "No song is playing."
    };
    msg.reply(ctx.cache_http, reply).await?;
    Ok(())
}

async fn stop(ctx: &Context<'_>, msg: &Message) -> Result<()> {
    let session = match msg.guild_id {
        Some(guild_id) => ctx
            .vstate
            .write()
            .await
            .music_sessions
            .remove(&guild_id)
            .map(|channel_id| (guild_id, channel_id)),
        None => None,
    };
    let Some((guild_id, channel_id)) = session else {
        msg.reply(ctx.cache_http, "Bot is not connected to a voice channel.")
            .await?;
        return Ok(());
    };

    disconnect(ctx, guild_id).await?;
    rename_channel(ctx.http, channel_id, None).await;
    log_internal!("Stopped music in {}", channel_id);

    msg.reply(ctx.cache_http, "Playback stopped and bot disconnected.")
        .await?;
    Ok(())
}

async fn disconnect(ctx: &Context<'_>, guild_id: GuildId) -> Result<()> {
    let manager = songbird(ctx).await?;
    if let Some(call) = manager.get(guild_id) {
        call.lock().await.queue().stop();
    }
    manager
        .remove(guild_id)
        .await
        .map_err(|e| anyhow!("Could not leave voice in {}: {}", guild_id, e))
}

/// Failures are only logged.
async fn rename_channel(http: &Arc<Http>, channel_id: ChannelId, song: Option<&str>) {
    let name = channel_name(song);
    if let Err(err) = channel_id.edit(http, EditChannel::new().name(&name)).await {
        log_error!("Could not rename {} to `{}`: {}", channel_id, name, err);
    } else {
        log_internal!("Renamed {} to `{}`", channel_id.color(http).await, name);
    }
}

/// Every audio file below `folder`, subdirectories included.
async fn audio_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![folder.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
            continue;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            match entry.file_type().await {
                Ok(kind) if kind.is_dir() => pending.push(path),
                Ok(_) if is_audio_file(&path) => files.push(path),
                _ => {}
            }
        }
    }

    files
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// `(title, artist)` from a `Song Title - Artist.mp3` style file name.  Artist is empty when the
/// name has no dash.
fn parse_file_name(path: &str) -> (String, String) {
    let stem = Path::new(path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parts: Vec<&str> = stem.split('-').map(str::trim).collect();

    match parts.split_last() {
        Some((artist, title)) if !title.is_empty() => (title.join("-"), (*artist).to_owned()),
        _ => (stem.clone(), String::new()),
    }
}

fn display_name(path: &str) -> String {
    match parse_file_name(path) {
        (title, artist) if artist.is_empty() => title,
        (title, artist) => format!("{} - {}", title, artist),
    }
}

fn channel_name(song: Option<&str>) -> String {
    match song {
        Some(song) => format!("Music 🎵 {}", song)
            .chars()
            .take(CHANNEL_NAME_LIMIT)
            .collect(),
        None => "Music 🎵 Idle...".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_split_on_the_last_dash() {
        assert_eq!(
            parse_file_name("/music/Still Alive - GLaDOS.mp3"),
            ("Still Alive".to_owned(), "GLaDOS".to_owned())
        );
        assert_eq!(
            parse_file_name("Want You Gone - Part 2 - GLaDOS.flac"),
            ("Want You Gone-Part 2".to_owned(), "GLaDOS".to_owned())
        );
        assert_eq!(
            parse_file_name("Cara Mia.opus"),
            ("Cara Mia".to_owned(), String::new())
        );
    }

    #[test]
    fn display_names() {
        assert_eq!(display_name("Still Alive - GLaDOS.mp3"), "Still Alive - GLaDOS");
        assert_eq!(display_name("Cara Mia.opus"), "Cara Mia");
    }

    #[test]
    fn channel_names_fit_discord() {
        assert_eq!(channel_name(None), "Music 🎵 Idle...");
        assert_eq!(channel_name(Some("Still Alive")), "Music 🎵 Still Alive");

        let long = "x".repeat(200);
        assert_eq!(channel_name(Some(&long)).chars().count(), CHANNEL_NAME_LIMIT);
    }

    #[test]
    fn audio_extensions() {
        assert!(is_audio_file(Path::new("a.MP3")));
        assert!(is_audio_file(Path::new("dir/b.m4a")));
        assert!(!is_audio_file(Path::new("cover.jpg")));
        assert!(!is_audio_file(Path::new("noext")));
    }

    #[tokio::test]
    async fn finds_audio_in_subfolders() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("album")).unwrap();
        std::fs::write(dir.path().join("one.mp3"), b"").unwrap();
        std::fs::write(dir.path().join("album").join("two.flac"), b"").unwrap();
        std::fs::write(dir.path().join("album").join("cover.png"), b"").unwrap();

        let mut files = audio_files(dir.path()).await;
        files.sort();

        assert_eq!(
            files,
            vec![
                dir.path().join("album").join("two.flac"),
                dir.path().join("one.mp3"),
            ]
        );
    }
}
