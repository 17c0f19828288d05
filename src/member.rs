//! The narrow view of a server member the engines work with.

use crate::context::Context;
use anyhow::{anyhow, Result};
use serenity::all::{ChannelId, GuildId, Member, RoleId, UserId};

/// What the progression, title and challenge code needs to know about a member.
pub trait MemberView {
    fn id(&self) -> UserId;
    /// `<@id>`, pings the member when sent
    fn mention(&self) -> String;
    /// Voice channel the member currently sits in, if any
    fn voice_channel(&self) -> Option<ChannelId>;
    fn roles(&self) -> &[RoleId];

    fn has_role(&self, role_id: RoleId) -> bool {
        self.roles().contains(&role_id)
    }
}

/// [`MemberView`] over a Serenity guild member.
pub struct ServerMember {
    pub member: Member,
    voice_channel: Option<ChannelId>,
}

impl ServerMember {
    /// Look the member up, preferring the cache over an HTTP request.
    pub async fn fetch(ctx: &Context<'_>, guild_id: GuildId, user_id: UserId) -> Result<Self> {
        let member = guild_id
            .member(ctx.cache_http, user_id)
            .await
            .map_err(|e| anyhow!("Could not fetch member {} in {}: {}", user_id, guild_id, e))?;

        // Cache guards are not `Send`; copy what we need out before any further `.await`.
        let voice_channel = ctx
            .cache
            .guild(guild_id)
            .and_then(|guild| guild.voice_states.get(&user_id).and_then(|vs| vs.channel_id));

        Ok(Self {
            member,
            voice_channel,
        })
    }

}

impl MemberView for ServerMember {
    fn id(&self) -> UserId {
        self.member.user.id
    }

    fn mention(&self) -> String {
        format!("<@{}>", self.member.user.id)
    }

    fn voice_channel(&self) -> Option<ChannelId> {
        self.voice_channel
    }

    fn roles(&self) -> &[RoleId] {
        &self.member.roles
    }
}
