use crate::{
    challenge::{
        await_within,
        riddle::{pick_riddle, resolve_riddle, CandidateAnswer, RiddleVerdict},
        Outcome,
    },
    event::*,
    helper::{describe_role_error, grant_named_role},
    log_internal,
    logging::PrintColor,
    plugin::*,
};
use anyhow::Result;
use serenity::all::{Mentionable, ReactionType};
use std::time::Duration;

const CONFIRM_EMOJI: &str = "✅";

/// Poses a riddle, takes one answer and asks for it to be confirmed before scoring.
pub struct Riddle;

#[serenity::async_trait]
impl Plugin for Riddle {
    fn name(&self) -> &'static str {
        "riddle"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let description = "answer a riddle, earn a reputation";
        Some(usage_line(ctx, self.name(), description).await)
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, _)) = event.is_bot_cmd(ctx, self.name()).await else {
            return Ok(EventHandled::No);
        };
        let user_id = msg.author.id;

        let slot = ctx.vstate.read().await.challenges.begin(user_id);
        let Some(_slot) = slot else {
            msg.reply(ctx.cache_http, "Finish your current test first.")
                .await?;
            return Ok(EventHandled::Yes);
        };

        let used = ctx.pstate.riddle_scores.score(user_id).await.used_riddles;
        let (riddle, answer_timeout, confirm_timeout, roles) = {
            let cfg = ctx.cfg.read().await;
            (
                pick_riddle(&cfg.riddles.pool, &used, &mut rand::thread_rng()).cloned(),
                Duration::from_secs(cfg.riddles.answer_timeout_secs),
                Duration::from_secs(cfg.riddles.confirm_timeout_secs),
                cfg.riddles.roles.clone(),
            )
        };
        let Some(riddle) = riddle else {
            msg.reply(
                ctx.cache_http,
                "You have already faced every riddle I know. Impressive, for a test subject.",
            )
            .await?;
            return Ok(EventHandled::Yes);
        };

        msg.reply(
            ctx.cache_http,
            format!(
                "🧩 **Riddle:** {}\nYou have {} seconds to answer.",
                riddle.question,
                answer_timeout.as_secs()
            ),
        )
        .await?;

        // Phase one: the answer
        let answer = msg
            .channel_id
            .await_reply(ctx.cache_http)
            .author_id(user_id)
            .next();
        let candidate = match await_within(answer_timeout, answer).await {
            Outcome::TimedOut => Outcome::TimedOut,
            Outcome::Completed(answer) => {
                // Phase two: the confirmation
                let prompt = answer
                    .reply(
                        ctx.cache_http,
                        format!(
                            "Is that your final answer? React with {} within {} seconds to lock it in.",
                            CONFIRM_EMOJI,
                            confirm_timeout.as_secs()
                        ),
                    )
                    .await?;
                prompt
                    .react(ctx.cache_http, ReactionType::Unicode(CONFIRM_EMOJI.to_owned()))
                    .await?;

                let confirmation = prompt
                    .await_reaction(ctx.cache_http)
                    .author_id(user_id)
                    .filter(|reaction| reaction.emoji.unicode_eq(CONFIRM_EMOJI))
                    .next();

                Outcome::Completed(CandidateAnswer {
                    text: answer.content.clone(),
                    confirmation: await_within(confirm_timeout, confirmation)
                        .await
                        .map(|_| ()),
                })
            }
        };

        let verdict = ctx
            .pstate
            .riddle_scores
            .update(|book| resolve_riddle(book, user_id, &riddle, candidate, &roles))
            .await?;

        let reply = match &verdict {
            RiddleVerdict::Correct { score, .. } => format!(
                "Correct! That makes {} correct answer(s).",
                score.correct_count
            ),
            RiddleVerdict::Wrong { score } => format!(
                "Wrong. The answer was **{}**. Wrong answers so far: {}.",
                riddle.answers.first().map(String::as_str).unwrap_or("?"),
                score.wrong_count
            ),
            RiddleVerdict::TimedOut { score } => format!(
                "Time is up. That counts as wrong. Wrong answers so far: {}.",
                score.wrong_count
            ),
            RiddleVerdict::Discarded => {
                "No confirmation, no answer. The riddle stays unsolved and unscored.".to_owned()
            }
        };
        msg.reply(ctx.cache_http, reply).await?;

        if let RiddleVerdict::Correct { new_roles, .. } = verdict {
            for role in new_roles {
                log_internal!("{} earned {}", msg.author.color(), role);
                let mut note = format!("🎓 {} is now a **{}**!", msg.author.mention(), role);
                if let Some(guild_id) = msg.guild_id {
                    let reason = "Riddle milestone";
                    let granted = grant_named_role(ctx, guild_id, user_id, &role, reason);
                    if let Err(err) = granted.await {
                        note.push('\n');
                        note.push_str(&describe_role_error(&role, &err));
                    }
                }
                msg.channel_id.say(ctx.cache_http, note).await?;
            }
        }

        Ok(EventHandled::Yes)
    }
}
