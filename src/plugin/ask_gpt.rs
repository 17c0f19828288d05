use crate::{
    event::*,
    helper::{split_for_discord, DISCORD_MESSAGE_LIMIT},
    llm::{consult, Persona},
    plugin::*,
};
use anyhow::Result;
use serenity::all::Mentionable;

/// Explicit question for the model, as opposed to just talking at the bot.
pub struct AskGpt;

#[serenity::async_trait]
impl Plugin for AskGpt {
    fn name(&self) -> &'static str {
        "askgpt"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let description = "<prompt> - ask GPT anything";
        Some(usage_line(ctx, self.name(), description).await)
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, prompt)) = event.is_bot_cmd(ctx, self.name()).await else {
            return Ok(EventHandled::No);
        };
        if prompt.is_empty() {
            let usage = self.usage(ctx).await.unwrap_or_default();
            msg.reply(ctx.cache_http, format!("Usage: `{}`", usage))
                .await?;
            return Ok(EventHandled::Yes);
        }

        let typing = msg.channel_id.start_typing(ctx.http);
        let response = consult(ctx, Persona::Assistant, prompt).await;
        typing.stop();

        let text = format!("{}, GPT suggests:\n\n{}", msg.author.mention(), response);
        for piece in split_for_discord(&text, DISCORD_MESSAGE_LIMIT) {
            msg.channel_id.say(ctx.cache_http, piece).await?;
        }
        Ok(EventHandled::Yes)
    }
}
