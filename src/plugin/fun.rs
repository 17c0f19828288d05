//! Small commands with no state of their own.

use crate::{event::*, plugin::*};
use anyhow::Result;
use serenity::all::{CreateEmbed, CreateMessage, Mentionable, Message, User};

/// Server card with member count and owner.
pub struct Info;

pub struct CakeOrLie;

pub struct CompanionCube;

/// Reprimands the mentioned user.  Gently.
pub struct Toxin;

/// The first user mentioned in `msg`, or a usage reply when there is none.
async fn mentioned_user<'m>(
    ctx: &Context<'_>,
    msg: &'m Message,
    usage: Option<String>,
) -> Result<Option<&'m User>> {
    let user = msg.mentions.first();
    if user.is_none() {
        msg.reply(
            ctx.cache_http,
            format!("Usage: `{}`", usage.unwrap_or_default()),
        )
        .await?;
    }
    Ok(user)
}

#[serenity::async_trait]
impl Plugin for Info {
    fn name(&self) -> &'static str {
        "info"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let description = "display server information";
        Some(usage_line(ctx, self.name(), description).await)
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, _)) = event.is_bot_cmd(ctx, self.name()).await else {
            return Ok(EventHandled::No);
        };
        let Some(guild_id) = msg.guild_id else {
            msg.reply(ctx.cache_http, "This only works on a server.")
                .await?;
            return Ok(EventHandled::Yes);
        };

        // Cache guards are not `Send`; copy out before awaiting.
        let cached = ctx
            .cache
            .guild(guild_id)
            .map(|guild| (guild.name.clone(), guild.member_count, guild.owner_id));
        let (name, member_count, owner_id) = match cached {
            Some(card) => card,
            None => {
                let guild = guild_id.to_partial_guild_with_counts(ctx.http).await?;
                (
                    guild.name,
                    guild.approximate_member_count.unwrap_or_default(),
                    guild.owner_id,
                )
            }
        };
        let owner = guild_id.member(ctx.cache_http, owner_id).await?;

        let embed = CreateEmbed::new()
            .title(format!("{} Information", name))
            .color(0x008080)
            .field("Members", member_count.to_string(), true)
            .field("Owner", owner.display_name(), true);
        msg.channel_id
            .send_message(ctx.cache_http, CreateMessage::new().embed(embed))
            .await?;
        Ok(EventHandled::Yes)
    }
}

#[serenity::async_trait]
impl Plugin for CakeOrLie {
    fn name(&self) -> &'static str {
        "cakeorlie"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let description = "@user - a polite choice: Cake 🍰 or Truth ☕";
        Some(usage_line(ctx, self.name(), description).await)
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, _)) = event.is_bot_cmd(ctx, self.name()).await else {
            return Ok(EventHandled::No);
        };
        if let Some(user) = mentioned_user(ctx, msg, self.usage(ctx).await).await? {
            msg.channel_id
                .say(
                    ctx.cache_http,
                    format!(
                        "{}, pray tell, will you choose Cake 🍰 or Truth ☕?",
                        user.mention()
                    ),
                )
                .await?;
        }
        Ok(EventHandled::Yes)
    }
}

#[serenity::async_trait]
impl Plugin for CompanionCube {
    fn name(&self) -> &'static str {
        "companioncube"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let description = "@user - assign a virtual Companion Cube";
        Some(usage_line(ctx, self.name(), description).await)
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, _)) = event.is_bot_cmd(ctx, self.name()).await else {
            return Ok(EventHandled::No);
        };
        if let Some(user) = mentioned_user(ctx, msg, self.usage(ctx).await).await? {
            msg.channel_id
                .say(
                    ctx.cache_http,
                    format!(
                        "{}, you've been entrusted with a Companion Cube. Treat it with care. 🎁",
                        user.mention()
                    ),
                )
                .await?;
        }
        Ok(EventHandled::Yes)
    }
}

#[serenity::async_trait]
impl Plugin for Toxin {
    fn name(&self) -> &'static str {
        "toxin"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let description = "@user - deliver a gentle reprimand";
        Some(usage_line(ctx, self.name(), description).await)
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, _)) = event.is_bot_cmd(ctx, self.name()).await else {
            return Ok(EventHandled::No);
        };
        if let Some(user) = mentioned_user(ctx, msg, self.usage(ctx).await).await? {
            msg.channel_id
                .say(
                    ctx.cache_http,
                    format!("{} has been ever so gently reprimanded.", user.name),
                )
                .await?;
        }
        Ok(EventHandled::Yes)
    }
}
