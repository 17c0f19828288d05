use crate::{event::*, plugin::*};
use anyhow::Result;

/// Bots, including this one, never trigger anything.
pub struct IgnoreBots;

#[serenity::async_trait]
impl Plugin for IgnoreBots {
    fn name(&self) -> &'static str {
        "ignore_bots"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        None
    }

    async fn handle(&self, _ctx: &Context, event: &Event) -> Result<EventHandled> {
        let is_bot = match event {
            Event::Message(msg) => msg.author.bot,
            Event::MemberJoin(member) => member.user.bot,
            Event::MemberLeave { user, .. } => user.bot,
            _ => false,
        };

        if is_bot {
            Ok(EventHandled::Yes)
        } else {
            Ok(EventHandled::No)
        }
    }
}
