//! Miscellaneous convenience methods

use crate::{context::Context, log_internal, logging::RoleName, logging::PrintColor};
use anyhow::Result;
use serenity::all::{EditRole, GuildId, RoleId, UserId};
use std::{
    collections::HashMap,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// Discord refuses messages over 2000 characters.  Leave some headroom for mentions.
pub const DISCORD_MESSAGE_LIMIT: usize = 1900;

/// Upper bound on any call to an outside web service.
pub const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(20);

#[serenity::async_trait]
pub trait UserIdHelper {
    async fn nick_in_guild(&self, ctx: &Context, guild_id: Option<GuildId>) -> String;
}

#[serenity::async_trait]
impl UserIdHelper for serenity::all::UserId {
    async fn nick_in_guild(&self, ctx: &Context, guild_id: Option<GuildId>) -> String {
        let user = match self.to_user(ctx.cache_http).await {
            Ok(user) => user,
            Err(_) => return format!("<unknown-user-{}>", *self),
        };

        user.nick_in_guild(ctx, guild_id).await
    }
}

#[serenity::async_trait]
pub trait UserHelper {
    async fn nick_in_guild(&self, ctx: &Context, guild_id: Option<GuildId>) -> String;
}

#[serenity::async_trait]
impl UserHelper for serenity::all::User {
    async fn nick_in_guild(&self, ctx: &Context, guild_id: Option<GuildId>) -> String {
        let nick_in_guild = match guild_id {
            Some(guild_id) => self.nick_in(ctx.cache_http, guild_id).await,
            None => None,
        };

        // May not be in a guild, e.g. DM.  Fall back to global username.
        match nick_in_guild {
            Some(nick_in_guild) => nick_in_guild,
            None => self.name.clone(),
        }
    }
}

#[serenity::async_trait]
pub trait MessageHelper {
    async fn human_format_content(&self, ctx: &Context) -> Result<String>;
    async fn is_to_me(&self, ctx: &Context) -> Result<bool>;
    async fn is_from_owner(&self, ctx: &Context) -> bool;
}

#[serenity::async_trait]
impl MessageHelper for serenity::all::Message {
    /// Convert discord-formatted message content, which may contain non-user-friendly markup, to a
    /// human-friendly format.  Also useful for LLMs.
    ///
    /// Serenity provides a message.content_safe() method which uses global discord names rather
    /// than our preferred per-server names.  Thus, we're reimplementing the logic here with the
    /// preferred name.
    async fn human_format_content(&self, ctx: &Context) -> Result<String> {
        let mut content = self.content.clone();

        // Create a mapping from mention strings to their names
        let mut mention_map: HashMap<String, String> = HashMap::new();

        // Map user mentions (e.g. `<@!1234567890>`)
        for user in &self.mentions {
            let user_id = user.id;
            let mention_with_nickname = format!("<@!{}>", user_id);
            let mention_without_nickname = format!("<@{}>", user_id);

            let name = user.id.nick_in_guild(ctx, self.guild_id).await;

            mention_map.insert(mention_with_nickname, name.clone());
            mention_map.insert(mention_without_nickname, name);
        }

        if let Some(guild) = self.guild(ctx.cache) {
            // Map role mentions (e.g. `<@&1234567890>`)
            for role_id in &self.mention_roles {
                let mention = format!("<@&{}>", role_id);

                if let Some(role) = guild.roles.get(role_id) {
                    mention_map.insert(mention, format!("@{}", role.name));
                } else {
                    mention_map.insert(mention, "@UnknownRole".to_string());
                }
            }

            // Map channel mentions (e.g. `<#1234567890>`)
            for channel in &self.mention_channels {
                let channel_id = channel.id;
                let mention = format!("<#{}>", channel_id);

                if let Some(channel) = guild.channels.get(&channel_id) {
                    mention_map.insert(mention, format!("#{}", channel.name));
                } else {
                    mention_map.insert(mention, "#UnknownChannel".to_string());
                }
            }
        }

        for (mention, name) in mention_map {
            content = content.replace(&mention, &name);
        }

        Ok(content)
    }

    async fn is_to_me(&self, ctx: &Context) -> Result<bool> {
        // Every DM is addressed to the bot
        if self.guild_id.is_none() {
            return Ok(true);
        }

        // mentions me, the bot, directly
        if self.mentions_me(ctx.cache_http).await? {
            return Ok(true);
        }

        Ok(false)
    }

    async fn is_from_owner(&self, ctx: &Context) -> bool {
        let owners = &ctx.cfg.read().await.general.bot_owners;
        owners.contains(&self.author.name)
    }
}

/// Role ids keyed by role name for every role in the guild.  Served from the cache when possible.
pub async fn guild_roles_by_name(
    ctx: &Context<'_>,
    guild_id: GuildId,
) -> serenity::Result<HashMap<String, RoleId>> {
    let cached: Option<HashMap<String, RoleId>> = ctx.cache.guild(guild_id).map(|guild| {
        guild
            .roles
            .values()
            .map(|role| (role.name.clone(), role.id))
            .collect()
    });
    if let Some(roles) = cached {
        return Ok(roles);
    }

    Ok(guild_id
        .roles(ctx.http)
        .await?
        .into_values()
        .map(|role| (role.name, role.id))
        .collect())
}

/// Look a role up by name, creating it if the guild does not have one yet.
pub async fn get_or_create_role(
    ctx: &Context<'_>,
    guild_id: GuildId,
    name: &str,
) -> serenity::Result<RoleId> {
    if let Some(&role_id) = guild_roles_by_name(ctx, guild_id).await?.get(name) {
        return Ok(role_id);
    }

    let role = guild_id
        .create_role(ctx.cache_http, EditRole::new().name(name))
        .await?;
    log_internal!("Created role {}", RoleName(name).color());
    Ok(role.id)
}

/// Give `user_id` the role called `name`, creating the role if needed.
pub async fn grant_named_role(
    ctx: &Context<'_>,
    guild_id: GuildId,
    user_id: UserId,
    name: &str,
    reason: &str,
) -> serenity::Result<RoleId> {
    let role_id = get_or_create_role(ctx, guild_id, name).await?;
    ctx.http
        .add_member_role(guild_id, user_id, role_id, Some(reason))
        .await?;
    Ok(role_id)
}

/// Whether Discord turned a request down because the bot lacks permissions.
pub fn is_permission_error(err: &serenity::Error) -> bool {
    use serenity::{http::HttpError, model::ModelError};

    match err {
        serenity::Error::Model(ModelError::InvalidPermissions { .. }) => true,
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => {
            response.status_code.as_u16() == 403
        }
        _ => false,
    }
}

/// User-facing explanation of a failed role change.
pub fn describe_role_error(role: &str, err: &serenity::Error) -> String {
    if is_permission_error(err) {
        format!(
            "I'm afraid I lack the permissions to manage the **{}** role.",
            role
        )
    } else {
        format!("I could not update the **{}** role: {}", role, err)
    }
}

/// HTTP client for outside web services.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(OUTBOUND_TIMEOUT)
        .user_agent(concat!("labrat/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(Into::into)
}

/// Current UNIX time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Cut `text` into pieces of at most `limit` characters, preferring to break at line ends.
pub fn split_for_discord(text: &str, limit: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for line in text.split_inclusive('\n') {
        if current.chars().count() + line.chars().count() > limit && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
        }

        // A single line longer than the limit gets hard-wrapped.
        let mut line = line;
        while line.chars().count() > limit {
            let cut = line
                .char_indices()
                .nth(limit)
                .map(|(i, _)| i)
                .unwrap_or(line.len());
            pieces.push(line[..cut].to_owned());
            line = &line[cut..];
        }
        current.push_str(line);
    }

    if !current.trim().is_empty() {
        pieces.push(current);
    }

    pieces
}
