use crate::{
    event::*,
    helper::{describe_role_error, get_or_create_role, guild_roles_by_name},
    log_internal,
    logging::{PrintColor, RoleName},
    member::{MemberView, ServerMember},
    plugin::*,
    progression::{plan_rank_change, RankTable},
};
use anyhow::Result;
use serenity::all::{GuildId, Message};

/// Counts messages and promotes members along the rank table.
///
/// Never claims the event: a counted message may still be a command.
pub struct Rank;

#[serenity::async_trait]
impl Plugin for Rank {
    fn name(&self) -> &'static str {
        "rank"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        None
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::Message(msg) = event else {
            return Ok(EventHandled::No);
        };
        let Some(guild_id) = msg.guild_id else {
            return Ok(EventHandled::No);
        };

        let primary = ctx.cfg.read().await.guild.primary_guild_id;
        if primary.is_some_and(|primary| primary != guild_id) {
            return Ok(EventHandled::No);
        }

        let count = ctx
            .pstate
            .message_counts
            .record_activity(msg.author.id)
            .await?;

        let rank = {
            let cfg = ctx.cfg.read().await;
            RankTable::new(&cfg.progression.ranks)
                .resolve_rank(count)
                .map(str::to_owned)
        };

        if let Some(rank) = rank {
            apply_rank(ctx, msg, guild_id, &rank).await?;
        }

        Ok(EventHandled::No)
    }
}

/// Put the author of `msg` on `rank`, announcing the promotion in the channel.
async fn apply_rank(
    ctx: &Context<'_>,
    msg: &Message,
    guild_id: GuildId,
    rank: &str,
) -> Result<()> {
    let (table, default_role) = {
        let cfg = ctx.cfg.read().await;
        (
            RankTable::new(&cfg.progression.ranks),
            cfg.guild.default_role_id,
        )
    };

    let member = ServerMember::fetch(ctx, guild_id, msg.author.id).await?;
    let guild_roles = guild_roles_by_name(ctx, guild_id).await?;

    let Some(change) = plan_rank_change(&table, rank, &member, &guild_roles, default_role) else {
        return Ok(());
    };

    // The member cache lags behind role grants, so two quick messages can both get this far.
    // Only the one that records the rank first announces it.
    let previous = ctx.pstate.ranks.claim_rank(member.id(), rank).await?;
    let announce = previous.as_deref() != Some(rank);

    let granted = match change.grant {
        Some(role_id) => Ok(role_id),
        None => get_or_create_role(ctx, guild_id, rank).await,
    };
    let granted = match granted {
        Ok(role_id) => {
            ctx.http
                .add_member_role(guild_id, member.id(), role_id, Some("Rank progression"))
                .await
        }
        Err(err) => Err(err),
    };
    if let Err(err) = granted {
        if announce {
            ctx.pstate.ranks.restore_rank(member.id(), previous).await?;
        }
        msg.channel_id
            .say(ctx.cache_http, describe_role_error(rank, &err))
            .await?;
        return Ok(());
    }

    if announce {
        msg.channel_id
            .say(
                ctx.cache_http,
                format!("{}, you have been promoted to **{}**!", member.mention(), rank),
            )
            .await?;
        log_internal!(
            "Promoted {} to {}",
            member.member.color(),
            RoleName(rank).color()
        );
    }

    for role_id in change.revoke {
        if let Err(err) = ctx
            .http
            .remove_member_role(guild_id, member.id(), role_id, Some("Rank progression"))
            .await
        {
            let name = guild_roles
                .iter()
                .find(|(_, &id)| id == role_id)
                .map(|(name, _)| name.as_str())
                .unwrap_or("previous rank");
            msg.channel_id
                .say(ctx.cache_http, describe_role_error(name, &err))
                .await?;
        }
    }

    Ok(())
}
