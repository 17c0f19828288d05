use crate::{
    event::*,
    helper::{split_for_discord, unix_now, DISCORD_MESSAGE_LIMIT},
    persistent_state::ConversationEntry,
    plugin::*,
};
use anyhow::Result;

/// Entries shown back to the user.
const HISTORY_SHOWN: usize = 5;

/// Echo chat with a conversation history that survives restarts.
pub struct Chat;

#[serenity::async_trait]
impl Plugin for Chat {
    fn name(&self) -> &'static str {
        "chat"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let description = "<message> - chat with a bot that remembers";
        Some(usage_line(ctx, self.name(), description).await)
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, message)) = event.is_bot_cmd(ctx, self.name()).await else {
            return Ok(EventHandled::No);
        };
        if message.is_empty() {
            let usage = self.usage(ctx).await.unwrap_or_default();
            msg.reply(ctx.cache_http, format!("Usage: `{}`", usage))
                .await?;
            return Ok(EventHandled::Yes);
        }

        let user_id = msg.author.id;
        let history = ctx
            .pstate
            .conversations
            .append(user_id, unix_now(), format!("User: {}", message))
            .await?;
        let recent = &history[history.len().saturating_sub(HISTORY_SHOWN)..];

        let bot_reply = format!("You said: {}", message);
        let response = render_history(recent, &bot_reply);
        ctx.pstate
            .conversations
            .append(user_id, unix_now(), format!("Bot: {}", bot_reply))
            .await?;

        for piece in split_for_discord(&response, DISCORD_MESSAGE_LIMIT) {
            msg.channel_id.say(ctx.cache_http, piece).await?;
        }
        Ok(EventHandled::Yes)
    }
}

fn render_history(entries: &[ConversationEntry], bot_reply: &str) -> String {
    let lines = entries
        .iter()
        .map(|entry| format!("[{}] {}", entry.timestamp, entry.message))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "**Conversation history:**\n{}\n\n**Bot:** {}",
        lines, bot_reply
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_rendered_oldest_first() {
        let entries = vec![
            ConversationEntry {
                timestamp: 10,
                message: "User: hello".to_owned(),
            },
            ConversationEntry {
                timestamp: 11,
                message: "Bot: You said: hello".to_owned(),
            },
            ConversationEntry {
                timestamp: 20,
                message: "User: again".to_owned(),
            },
        ];

        assert_eq!(
            render_history(&entries, "You said: again"),
            "**Conversation history:**\n\
             [10] User: hello\n\
             [11] Bot: You said: hello\n\
             [20] User: again\n\n\
             **Bot:** You said: again"
        );
    }
}
