//! The Serenity crate we're using for the Discord API is designed around callbacks to handle
//! events.  However, this does not mesh well with our plugin framework here.  To resolve this,
//! the handler translates the callbacks into a distinct Event enum which is then offered to every
//! plugin in turn.

use crate::{context::Context, log_error};
use serenity::all::{GuildId, Member, Message, Reaction, Ready, User, VoiceState};

/// A Discord event
pub enum Event {
    Ready(Ready),
    Message(Message),
    VoiceStateUpdate {
        old: Option<VoiceState>,
        new: VoiceState,
    },
    ReactionAdd(Reaction),
    ReactionRemove(Reaction),
    MemberJoin(Member),
    MemberLeave {
        guild_id: GuildId,
        user: User,
    },
}

pub enum EventHandled {
    Yes,
    No,
}

impl Event {
    // When an event occurs, iterate over all the plugins to see if any can/should handle it.
    pub async fn handle(self, ctx: Context<'_>) {
        for plugin in crate::plugin::plugins() {
            match plugin.handle(&ctx, &self).await {
                Ok(EventHandled::Yes) => return,
                Ok(EventHandled::No) => continue,
                Err(err) => log_error!("Error in plugin {}: {}", plugin.name(), err),
            }
        }
    }

    /// Check if a message should be interpreted as a special bot command.
    ///
    /// These are prefixed with the configured command prefix, e.g. `;cmd foo bar baz`.  Returns the
    /// message and everything after the command name.
    pub async fn is_bot_cmd(&self, ctx: &Context<'_>, cmd: &str) -> Option<(&Message, &str)> {
        let Event::Message(msg) = self else {
            return None;
        };

        let prefix = ctx.cfg.read().await.general.command_prefix.clone();
        match split_command(&msg.content, &prefix) {
            Some((name, args)) if name.eq_ignore_ascii_case(cmd) => Some((msg, args)),
            _ => None,
        }
    }
}

/// Split `;name some args` into `("name", "some args")`.  `None` if `content` is not a command.
pub fn split_command<'a>(content: &'a str, prefix: &str) -> Option<(&'a str, &'a str)> {
    let rest = content.trim_start().strip_prefix(prefix)?;
    let (name, args) = match rest.find(char::is_whitespace) {
        Some(i) => (&rest[..i], rest[i..].trim()),
        None => (rest, ""),
    };

    if name.is_empty() {
        None
    } else {
        Some((name, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_with_arguments() {
        assert_eq!(
            split_command(";askgpt what is   the cake", ";"),
            Some(("askgpt", "what is   the cake"))
        );
    }

    #[test]
    fn command_without_arguments() {
        assert_eq!(split_command(";riddle", ";"), Some(("riddle", "")));
        assert_eq!(split_command("  ;riddle  ", ";"), Some(("riddle", "")));
    }

    #[test]
    fn plain_chatter_is_not_a_command() {
        assert_eq!(split_command("riddle me this", ";"), None);
        assert_eq!(split_command("; riddle", ";"), None);
        assert_eq!(split_command(";", ";"), None);
    }

    #[test]
    fn multi_character_prefix() {
        assert_eq!(split_command("lab!title", "lab!"), Some(("title", "")));
        assert_eq!(split_command(";title", "lab!"), None);
    }
}
