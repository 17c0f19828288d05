use crate::{
    challenge::{
        await_within,
        experiment::{
            resolve_experiment, Experiment as ExperimentSpec, ExperimentKind, ExperimentVerdict,
        },
        Outcome,
    },
    event::*,
    helper::{describe_role_error, grant_named_role},
    log_internal,
    logging::PrintColor,
    plugin::*,
};
use anyhow::Result;
use rand::seq::SliceRandom;
use serenity::all::{Mentionable, Message, ReactionType};
use std::time::Duration;

/// Hands out a random experiment and waits for the subject to complete it.
pub struct Experiment;

#[serenity::async_trait]
impl Plugin for Experiment {
    fn name(&self) -> &'static str {
        "experiment"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let description = "volunteer for a scientific experiment";
        Some(usage_line(ctx, self.name(), description).await)
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, _)) = event.is_bot_cmd(ctx, self.name()).await else {
            return Ok(EventHandled::No);
        };

        let slot = ctx.vstate.read().await.challenges.begin(msg.author.id);
        let Some(_slot) = slot else {
            msg.reply(ctx.cache_http, "Finish your current test first.")
                .await?;
            return Ok(EventHandled::Yes);
        };

        let (experiment, timeout, milestones) = {
            let cfg = ctx.cfg.read().await;
            (
                cfg.experiments.pool.choose(&mut rand::thread_rng()).cloned(),
                Duration::from_secs(cfg.experiments.timeout_secs),
                cfg.experiments.achievements.clone(),
            )
        };
        let Some(experiment) = experiment else {
            msg.reply(ctx.cache_http, "The lab has no experiments scheduled today.")
                .await?;
            return Ok(EventHandled::Yes);
        };

        let outcome = run(ctx, msg, &experiment, timeout).await?;

        let user_id = msg.author.id;
        let verdict = ctx
            .pstate
            .users
            .update(|book| resolve_experiment(book, user_id, &milestones, &outcome))
            .await?;

        match verdict {
            ExperimentVerdict::TimedOut => {
                msg.reply(
                    ctx.cache_http,
                    "The experiment has concluded without your participation. How disappointing.",
                )
                .await?;
            }
            ExperimentVerdict::Completed {
                experiments_completed,
                new_achievements,
            } => {
                log_internal!(
                    "{} completed experiment #{}",
                    msg.author.color(),
                    experiments_completed
                );
                msg.reply(
                    ctx.cache_http,
                    format!(
                        "Experiment complete. You have survived {} experiment(s) so far.",
                        experiments_completed
                    ),
                )
                .await?;
                announce_achievements(ctx, msg, &new_achievements).await?;
            }
        }

        Ok(EventHandled::Yes)
    }
}

/// Post the prompt, then wait for the subject to do what it asks.
async fn run(
    ctx: &Context<'_>,
    msg: &Message,
    experiment: &ExperimentSpec,
    timeout: Duration,
) -> Result<Outcome<()>> {
    let user_id = msg.author.id;
    let seconds = timeout.as_secs();

    let outcome = match &experiment.kind {
        ExperimentKind::Reaction { emoji } => {
            let prompt = msg
                .channel_id
                .say(
                    ctx.cache_http,
                    format!(
                        "🧪 **Experiment:** {}\nReact with {} within {} seconds.",
                        experiment.prompt, emoji, seconds
                    ),
                )
                .await?;
            prompt
                .react(ctx.cache_http, ReactionType::Unicode(emoji.clone()))
                .await?;

            let emoji = emoji.clone();
            let reaction = prompt
                .await_reaction(ctx.cache_http)
                .author_id(user_id)
                .filter(move |reaction| reaction.emoji.unicode_eq(&emoji))
                .next();
            await_within(timeout, reaction).await.map(|_| ())
        }
        ExperimentKind::Message { .. } => {
            let requirement = experiment.kind.requirement().unwrap_or_default();
            let rules = requirement
                .describe()
                .map(|rules| format!(" ({})", rules))
                .unwrap_or_default();
            msg.channel_id
                .say(
                    ctx.cache_http,
                    format!(
                        "🧪 **Experiment:** {}\nReply here within {} seconds{}.",
                        experiment.prompt, seconds, rules
                    ),
                )
                .await?;

            // Replies falling short are ignored; the subject may try again until time runs out.
            let reply = msg
                .channel_id
                .await_reply(ctx.cache_http)
                .author_id(user_id)
                .filter(move |reply| requirement.is_satisfied_by(&reply.content))
                .next();
            await_within(timeout, reply).await.map(|_| ())
        }
    };

    Ok(outcome)
}

/// Congratulate on each new achievement and hand out a role of the same name.
async fn announce_achievements(
    ctx: &Context<'_>,
    msg: &Message,
    achievements: &[String],
) -> Result<()> {
    for achievement in achievements {
        let mut note = format!(
            "🏆 {} unlocked the achievement **{}**!",
            msg.author.mention(),
            achievement
        );

        if let Some(guild_id) = msg.guild_id {
            let granted = grant_named_role(
                ctx,
                guild_id,
                msg.author.id,
                achievement,
                "Achievement unlocked",
            )
            .await;
            if let Err(err) = granted {
                note.push('\n');
                note.push_str(&describe_role_error(achievement, &err));
            }
        }

        msg.channel_id.say(ctx.cache_http, note).await?;
    }

    Ok(())
}
