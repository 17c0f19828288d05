use crate::{
    event::*,
    helper::{split_for_discord, MessageHelper, DISCORD_MESSAGE_LIMIT},
    llm::{consult, Persona},
    plugin::*,
};
use anyhow::Result;
use serenity::all::Mentionable;

pub struct LlmReply;

#[serenity::async_trait]
impl Plugin for LlmReply {
    fn name(&self) -> &'static str {
        "llm_reply"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        None
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::Message(msg) = event else {
            return Ok(EventHandled::No);
        };

        // Answers to a running experiment or riddle belong to the challenge.
        if ctx.vstate.read().await.challenges.contains(msg.author.id) {
            return Ok(EventHandled::No);
        }

        // Only respond if the message is to the bot
        if !msg.is_to_me(ctx).await? {
            return Ok(EventHandled::No);
        }

        let typing = msg.channel_id.start_typing(ctx.http);
        let prompt = msg.human_format_content(ctx).await?;
        let response = consult(ctx, Persona::Assistant, &prompt).await;
        typing.stop();

        let text = format!("{} {}", msg.author.mention(), response);
        for piece in split_for_discord(&text, DISCORD_MESSAGE_LIMIT) {
            msg.channel_id.say(ctx.cache_http, piece).await?;
        }
        Ok(EventHandled::Yes)
    }
}
