use crate::{
    event::*,
    helper::http_client,
    log_error, log_internal,
    logging::{AsyncPrintColor, PrintColor},
    plugin::*,
};
use anyhow::{anyhow, Result};
use rand::seq::SliceRandom;
use serenity::all::{
    ChannelId, CreateAttachment, CreateEmbed, CreateEmbedAuthor, CreateMessage, GuildId, Member,
    User,
};
use std::path::{Path, PathBuf};

/// Greets newcomers with their avatar and sees leavers off with a farewell line.
pub struct Welcome;

#[serenity::async_trait]
impl Plugin for Welcome {
    fn name(&self) -> &'static str {
        "welcome"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        None
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        match event {
            Event::MemberJoin(member) => greet(ctx, member).await?,
            Event::MemberLeave { guild_id, user } => farewell(ctx, *guild_id, user).await?,
            _ => return Ok(EventHandled::No),
        }

        Ok(EventHandled::Yes)
    }
}

/// Channel to post in, if `guild_id` is the primary guild and the channel is configured.
async fn channel_for(
    ctx: &Context<'_>,
    guild_id: GuildId,
    pick: impl Fn(&crate::config::Welcome) -> Option<ChannelId>,
) -> Option<ChannelId> {
    let cfg = ctx.cfg.read().await;
    if cfg.guild.primary_guild_id != Some(guild_id) {
        return None;
    }

    let channel = pick(&cfg.welcome);
    if channel.is_none() {
        log_error!("No welcome/farewell channel configured for the primary guild");
    }
    channel
}

async fn greet(ctx: &Context<'_>, member: &Member) -> Result<()> {
    let Some(channel_id) = channel_for(ctx, member.guild_id, |w| w.welcome_channel_id).await else {
        return Ok(());
    };

    let (avatars_dir, default_avatar) = {
        let cfg = ctx.cfg.read().await;
        (cfg.welcome.avatars_dir(), cfg.welcome.default_avatar())
    };

    let avatar = match member.user.avatar_url() {
        Some(url) => {
            let path = avatar_path(&avatars_dir, &member.user.name);
            match save_avatar(&url, &path).await {
                Ok(()) => path,
                Err(err) => {
                    log_error!("Could not save avatar of {}: {}", member.color(), err);
                    default_avatar
                }
            }
        }
        None => default_avatar,
    };

    let attachment = CreateAttachment::path(&avatar).await?;
    channel_id
        .send_message(ctx.cache_http, CreateMessage::new().add_file(attachment))
        .await?;

    log_internal!(
        "Welcomed {} in {}",
        member.color(),
        channel_id.color(ctx.http).await
    );
    Ok(())
}

async fn farewell(ctx: &Context<'_>, guild_id: GuildId, user: &User) -> Result<()> {
    let Some(channel_id) = channel_for(ctx, guild_id, |w| w.farewell_channel_id).await else {
        return Ok(());
    };

    let (avatars_dir, default_avatar, farewell_file) = {
        let cfg = ctx.cfg.read().await;
        (
            cfg.welcome.avatars_dir(),
            cfg.welcome.default_avatar(),
            cfg.welcome.farewell_file(),
        )
    };

    let mut avatar = avatar_path(&avatars_dir, &user.name);
    if tokio::fs::metadata(&avatar).await.is_err() {
        avatar = default_avatar;
    }
    let attachment = CreateAttachment::path(&avatar).await?;

    let lines = tokio::fs::read_to_string(&farewell_file).await.map_err(|e| {
        anyhow!(
            "Could not read farewell messages at `{}`: {}",
            farewell_file.to_string_lossy(),
            e
        )
    })?;
    let line = farewell_lines(&lines)
        .choose(&mut rand::thread_rng())
        .map(|line| render_farewell(line, &user.name))
        .unwrap_or_else(|| format!("Farewell, {}.", user.name));

    let mut embed = CreateEmbed::new()
        .description(line)
        .color(0xff0000)
        .thumbnail(format!("attachment://{}", attachment.filename));
    if let Some(icon) = ctx.cache.current_user().avatar_url() {
        embed = embed.author(CreateEmbedAuthor::new("Farewell!").icon_url(icon));
    }

    channel_id
        .send_message(
            ctx.cache_http,
            CreateMessage::new().embed(embed).add_file(attachment),
        )
        .await?;

    log_internal!(
        "Said farewell to {} in {}",
        user.color(),
        channel_id.color(ctx.http).await
    );
    Ok(())
}

fn avatar_path(avatars_dir: &Path, username: &str) -> PathBuf {
    avatars_dir.join(format!("{}.png", username))
}

async fn save_avatar(url: &str, path: &Path) -> Result<()> {
    let bytes = http_client()?
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Non-blank lines of the farewell file.
fn farewell_lines(contents: &str) -> Vec<&str> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

fn render_farewell(line: &str, name: &str) -> String {
    line.replace("{filename}", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_skipped() {
        let contents = "Goodbye, {filename}.\n\n   \nThe door closes behind {filename}.\n";
        assert_eq!(
            farewell_lines(contents),
            vec!["Goodbye, {filename}.", "The door closes behind {filename}."]
        );
    }

    #[test]
    fn name_is_substituted_everywhere() {
        assert_eq!(
            render_farewell("{filename} left. Bye {filename}!", "chell"),
            "chell left. Bye chell!"
        );
    }

    #[test]
    fn avatars_are_named_after_the_user() {
        assert_eq!(
            avatar_path(Path::new("welcomedata/Avatars"), "wheatley"),
            PathBuf::from("welcomedata/Avatars/wheatley.png")
        );
    }
}
