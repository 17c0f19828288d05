use crate::{
    config::Config, context::Context, event::Event, persistent_state::PersistentState,
    volatile_state::VolatileState,
};
use serenity::all::{GuildId, Member, Message, Reaction, Ready, User, VoiceState};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Discord event handler
///
/// State is behind `Arc`s so long running tasks spawned by plugins can keep hold of it.
pub struct Handler {
    cfg: Arc<RwLock<Config>>,
    pstate: Arc<PersistentState>,
    vstate: Arc<RwLock<VolatileState>>,
}

impl<'a> Handler {
    pub fn new(cfg: Config, pstate: PersistentState, vstate: VolatileState) -> Self {
        Self {
            cfg: Arc::new(RwLock::new(cfg)),
            pstate: Arc::new(pstate),
            vstate: Arc::new(RwLock::new(vstate)),
        }
    }

    fn ctx(&'a self, discord_ctx: &'a serenity::all::Context) -> Context<'a> {
        Context {
            cfg: &self.cfg,
            pstate: &self.pstate,
            vstate: &self.vstate,
            cache: &discord_ctx.cache,
            http: &discord_ctx.http,
            cache_http: discord_ctx,
        }
    }
}

#[serenity::async_trait]
impl serenity::all::EventHandler for Handler {
    async fn ready(&self, discord_ctx: serenity::all::Context, ready: Ready) {
        Event::Ready(ready).handle(self.ctx(&discord_ctx)).await;
    }

    async fn message(&self, discord_ctx: serenity::all::Context, msg: Message) {
        Event::Message(msg).handle(self.ctx(&discord_ctx)).await;
    }

    async fn voice_state_update(
        &self,
        discord_ctx: serenity::all::Context,
        old: Option<VoiceState>,
        new: VoiceState,
    ) {
        Event::VoiceStateUpdate { old, new }
            .handle(self.ctx(&discord_ctx))
            .await;
    }

    async fn reaction_add(&self, discord_ctx: serenity::all::Context, reaction: Reaction) {
        Event::ReactionAdd(reaction)
            .handle(self.ctx(&discord_ctx))
            .await;
    }

    async fn reaction_remove(&self, discord_ctx: serenity::all::Context, reaction: Reaction) {
        Event::ReactionRemove(reaction)
            .handle(self.ctx(&discord_ctx))
            .await;
    }

    async fn guild_member_addition(&self, discord_ctx: serenity::all::Context, member: Member) {
        Event::MemberJoin(member)
            .handle(self.ctx(&discord_ctx))
            .await;
    }

    async fn guild_member_removal(
        &self,
        discord_ctx: serenity::all::Context,
        guild_id: GuildId,
        user: User,
        _member: Option<Member>,
    ) {
        Event::MemberLeave { guild_id, user }
            .handle(self.ctx(&discord_ctx))
            .await;
    }
}
