use crate::{
    event::*,
    helper::{describe_role_error, grant_named_role, guild_roles_by_name, unix_now},
    log_internal,
    logging::{PrintColor, RoleName},
    plugin::*,
    title::{cooldown_from_days, format_cooldown, TitleGrant},
};
use anyhow::Result;
use serenity::all::Mentionable;

/// Hands out a random vanity title at most once per cooldown window.
pub struct Title;

#[serenity::async_trait]
impl Plugin for Title {
    fn name(&self) -> &'static str {
        "title"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let description = "claim a random title (once a week)";
        Some(usage_line(ctx, self.name(), description).await)
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, _)) = event.is_bot_cmd(ctx, self.name()).await else {
            return Ok(EventHandled::No);
        };
        let Some(guild_id) = msg.guild_id else {
            msg.reply(ctx.cache_http, "Titles are only handed out on a server.")
                .await?;
            return Ok(EventHandled::Yes);
        };

        let (pool, cooldown) = {
            let cfg = ctx.cfg.read().await;
            (cfg.titles.pool.clone(), cooldown_from_days(cfg.titles.cooldown_days))
        };
        let user_id = msg.author.id;
        let username = msg.author.name.clone();
        let now = unix_now();

        let grant = ctx
            .pstate
            .titles
            .update(|book| {
                let mut rng = rand::thread_rng();
                book.assign(user_id, &username, &pool, now, cooldown, &mut rng)
            })
            .await?;

        let (title, previous) = match grant {
            TitleGrant::CoolingDown(left) => {
                msg.reply(
                    ctx.cache_http,
                    format!(
                        "Patience. You can claim a new title in {}.",
                        format_cooldown(left)
                    ),
                )
                .await?;
                return Ok(EventHandled::Yes);
            }
            TitleGrant::Exhausted => {
                msg.reply(ctx.cache_http, "No titles available.").await?;
                return Ok(EventHandled::Yes);
            }
            TitleGrant::Assigned { title, previous } => (title, previous),
        };

        log_internal!("{} is now {}", msg.author.color(), RoleName(&title).color());

        let mut reply = format!(
            "{}, you shall henceforth be known as **{}**.",
            msg.author.mention(),
            title
        );
        if let Err(err) = grant_named_role(ctx, guild_id, user_id, &title, "Title").await {
            reply.push('\n');
            reply.push_str(&describe_role_error(&title, &err));
        }

        if let Some(previous) = previous {
            let previous_role = guild_roles_by_name(ctx, guild_id).await?.get(&previous).copied();
            if let Some(role_id) = previous_role {
                if let Err(err) = ctx
                    .http
                    .remove_member_role(guild_id, user_id, role_id, Some("Title replaced"))
                    .await
                {
                    reply.push('\n');
                    reply.push_str(&describe_role_error(&previous, &err));
                }
            }
        }

        msg.reply(ctx.cache_http, reply).await?;
        Ok(EventHandled::Yes)
    }
}
