//! Creepy images: pictures posted in one channel are kept, and resurface later when somebody says
//! something ominous or the server has been quiet for too long.

use crate::{
    config::Config, event::*, log_error, log_internal, logging::AsyncPrintColor, plugin::*,
    volatile_state::VolatileState,
};
use anyhow::{anyhow, Result};
use rand::{seq::SliceRandom, Rng};
use serenity::all::{Attachment, ChannelId, CreateAttachment, CreateMessage, Http};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::sync::RwLock;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

pub struct Creepy;

#[serenity::async_trait]
impl Plugin for Creepy {
    fn name(&self) -> &'static str {
        "creepy"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        None
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::Message(msg) = event else {
            return Ok(EventHandled::No);
        };

        ctx.vstate.write().await.touch();

        let (channel_id, save_folder, triggered, messages) = {
            let cfg = ctx.cfg.read().await;
            (
                cfg.creepy.channel_id,
                cfg.creepy.save_folder.clone(),
                mentions_trigger(&msg.content, &cfg.creepy.trigger_words),
                cfg.creepy.messages.clone(),
            )
        };

        if channel_id == Some(msg.channel_id) {
            for attachment in msg.attachments.iter().filter(|a| is_image(&a.filename)) {
                if let Err(err) = save_image(attachment, &save_folder).await {
                    log_error!("Could not save {}: {}", attachment.filename, err);
                }
            }
        }

        if triggered {
            send_creepy_image(ctx.http, msg.channel_id, &messages, &save_folder)
                .await?;
        }

        Ok(EventHandled::No)
    }
}

/// Whether `content` contains any of `words`, ignoring case.
fn mentions_trigger(content: &str, words: &[String]) -> bool {
    let content = content.to_lowercase();
    words
        .iter()
        .any(|word| !word.is_empty() && content.contains(&word.to_lowercase()))
}

fn is_image(filename: &str) -> bool {
    let filename = filename.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| filename.ends_with(ext))
}

async fn save_image(attachment: &Attachment, folder: &Path) -> Result<()> {
    let extension = attachment
        .filename
        .rsplit('.')
        .next()
        .unwrap_or("png")
        .to_lowercase();
    let path = folder.join(format!("{}.{}", attachment.id, extension));

    let bytes = attachment.download().await?;
    tokio::fs::create_dir_all(folder).await?;
    tokio::fs::write(&path, bytes).await?;

    log_internal!("Saved image `{}`", path.to_string_lossy());
    Ok(())
}

async fn saved_images(folder: &Path) -> Vec<PathBuf> {
    let mut images = Vec::new();
    let Ok(mut entries) = tokio::fs::read_dir(folder).await else {
        return images;
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(is_image)
        {
            images.push(path);
        }
    }
    images
}

/// Post a random creepy line with a random saved image.  `false` if there are no images yet.
async fn send_creepy_image(
    http: &Arc<Http>,
    channel_id: ChannelId,
    messages: &[String],
    folder: &Path,
) -> Result<bool> {
    let images = saved_images(folder).await;
    let picked = {
        let mut rng = rand::thread_rng();
        images
            .choose(&mut rng)
            .cloned()
            .map(|image| (image, messages.choose(&mut rng).cloned().unwrap_or_default()))
    };
    let Some((image, line)) = picked else {
        return Ok(false);
    };

    let attachment = CreateAttachment::path(&image).await?;
    let message = CreateMessage::new().content(line).add_file(attachment);
    channel_id.send_message(http, message).await?;
    Ok(true)
}

/// Silence lasting longer than `threshold`.  Nothing was said yet: not silent.
fn is_silent(elapsed: Option<Duration>, threshold: Duration) -> bool {
    elapsed.is_some_and(|elapsed| elapsed > threshold)
}

fn silence_threshold(min_secs: u64, max_secs: u64, rng: &mut impl Rng) -> Duration {
    let (low, high) = (min_secs.min(max_secs), min_secs.max(max_secs));
    Duration::from_secs(rng.gen_range(low..=high))
}

/// Background task: every check interval, break a long silence in the creepy channel.
pub async fn watch_silence(
    cfg: Arc<RwLock<Config>>,
    vstate: Arc<RwLock<VolatileState>>,
    http: Arc<Http>,
) {
    loop {
        let interval = Duration::from_secs(cfg.read().await.creepy.check_interval_secs.max(1));
        tokio::time::sleep(interval).await;

        if let Err(err) = check_silence(&cfg, &vstate, &http).await {
            log_error!("Silence watcher: {}", err);
        }
    }
}

async fn check_silence(
    cfg: &RwLock<Config>,
    vstate: &RwLock<VolatileState>,
    http: &Arc<Http>,
) -> Result<()> {
    let (channel_id, threshold, messages, folder) = {
        let cfg = cfg.read().await;
        let threshold = silence_threshold(
            cfg.creepy.silence_min_secs,
            cfg.creepy.silence_max_secs,
            &mut rand::thread_rng(),
        );
        (
            cfg.creepy.channel_id,
            threshold,
            cfg.creepy.messages.clone(),
            cfg.creepy.save_folder.clone(),
        )
    };
    let Some(channel_id) = channel_id else {
        return Ok(());
    };

    let elapsed = vstate.read().await.last_activity.map(|last| last.elapsed());
    if !is_silent(elapsed, threshold) {
        return Ok(());
    }

    log_internal!(
        "{} has been silent for a while",
        channel_id.color(http).await
    );
    send_creepy_image(http, channel_id, &messages, &folder)
        .await
        .map_err(|e| anyhow!("Could not break the silence: {}", e))?;
    vstate.write().await.touch();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn words() -> Vec<String> {
        ["shadow", "mirror", "eyes"]
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn trigger_words_match_anywhere_ignoring_case() {
        assert!(mentions_trigger("I saw a SHADOW in the hall", &words()));
        assert!(mentions_trigger("mirrors everywhere", &words()));
        assert!(!mentions_trigger("a perfectly normal day", &words()));
    }

    #[test]
    fn image_extensions() {
        assert!(is_image("cat.PNG"));
        assert!(is_image("old.jpeg"));
        assert!(!is_image("notes.txt"));
    }

    #[test]
    fn silence_needs_prior_activity() {
        let threshold = Duration::from_secs(2 * 3600);
        assert!(!is_silent(None, threshold));
        assert!(!is_silent(Some(Duration::from_secs(3600)), threshold));
        assert!(is_silent(Some(Duration::from_secs(3 * 3600)), threshold));
    }

    #[test]
    fn thresholds_stay_within_bounds() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            let t = silence_threshold(2 * 3600, 8 * 3600, &mut rng).as_secs();
            assert!((2 * 3600..=8 * 3600).contains(&t));
        }
        // Swapped bounds are tolerated
        let t = silence_threshold(10, 5, &mut rng).as_secs();
        assert!((5..=10).contains(&t));
    }

    #[tokio::test]
    async fn saved_images_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1.png"), b"png").unwrap();
        std::fs::write(dir.path().join("2.gif"), b"gif").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"txt").unwrap();

        let mut images = saved_images(dir.path()).await;
        images.sort();

        assert_eq!(
            images,
            vec![dir.path().join("1.png"), dir.path().join("2.gif")]
        );
    }

    #[tokio::test]
    async fn missing_folder_has_no_images() {
        let dir = tempfile::tempdir().unwrap();
        assert!(saved_images(&dir.path().join("nope")).await.is_empty());
    }
}
