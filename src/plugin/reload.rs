use crate::{
    event::*,
    helper::MessageHelper,
    llm::{consult, Persona},
    plugin::*,
};
use anyhow::Result;

pub struct Reload;

#[serenity::async_trait]
impl Plugin for Reload {
    fn name(&self) -> &'static str {
        "reload"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let description = "reload config (bot owner only)";
        Some(usage_line(ctx, self.name(), description).await)
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, _)) = event.is_bot_cmd(ctx, self.name()).await else {
            return Ok(EventHandled::No);
        };

        let response = if msg.is_from_owner(ctx).await {
            ctx.cfg.write().await.reload().await?;
            "Configuration reloaded successfully".to_owned()
        } else {
            let typing = msg.channel_id.start_typing(ctx.http);
            let response = consult(ctx, Persona::PermissionDenied, &msg.content).await;
            typing.stop();
            response
        };

        msg.reply(ctx.cache_http, response).await?;
        Ok(EventHandled::Yes)
    }
}
