use crate::{
    event::*,
    helper::{describe_role_error, grant_named_role, guild_roles_by_name},
    member::{MemberView, ServerMember},
    plugin::*,
};
use anyhow::Result;
use serenity::all::Mentionable;
use std::collections::BTreeSet;

const THOROUGH_REPORTER: &str = "Thorough Reporter";
const DETAILED_STEPS: &str = "Detailed Steps";
const VISUAL_EVIDENCE: &str = "Visual Evidence";
const DATA_DETECTIVE: &str = "Data Detective";
const COMMUNITY_SUPPORTER: &str = "Community Supporter";

/// A description this long counts as thorough.
const THOROUGH_DESCRIPTION_CHARS: usize = 100;

/// Takes bug reports and rewards the thorough ones.
pub struct BugReport;

#[derive(Debug, PartialEq, Eq)]
struct Report<'a> {
    description: &'a str,
    steps: Option<&'a str>,
    screenshot: Option<&'a str>,
}

#[serenity::async_trait]
impl Plugin for BugReport {
    fn name(&self) -> &'static str {
        "bugreport"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        Some(
            usage_line(
                ctx,
                self.name(),
                "<description> | [steps to reproduce] | [screenshot url] - report a bug, earn achievements",
            )
            .await,
        )
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, args)) = event.is_bot_cmd(ctx, self.name()).await else {
            return Ok(EventHandled::No);
        };
        let Some(report) = parse_report(args) else {
            let usage = self.usage(ctx).await.unwrap_or_default();
            msg.reply(ctx.cache_http, format!("Usage: `{}`", usage))
                .await?;
            return Ok(EventHandled::Yes);
        };

        let user_id = msg.author.id;
        let achievements = ctx
            .pstate
            .users
            .update(|book| {
                let record = book.entry(user_id);
                award(&report, &mut record.achievements);
                record.achievements.clone()
            })
            .await?;

        let mut reply = format!(
            "Thanks for your report, {}!\n**Current Achievements:** {}",
            msg.author.mention(),
            achievements.iter().cloned().collect::<Vec<_>>().join(", ")
        );

        if let (Some(role), Some(guild_id)) = (report_role(&achievements), msg.guild_id) {
            let member = ServerMember::fetch(ctx, guild_id, user_id).await?;
            let held = guild_roles_by_name(ctx, guild_id)
                .await?
                .get(role)
                .is_some_and(|&role_id| member.has_role(role_id));
            if !held {
                let granted = grant_named_role(ctx, guild_id, user_id, role, "Bug report");
                match granted.await {
                    Ok(_) => reply.push_str(&format!("\n**Achievement Role** `{}` granted!", role)),
                    Err(err) => {
                        reply.push('\n');
                        reply.push_str(&describe_role_error(role, &err));
                    }
                }
            }
        }

        msg.reply(ctx.cache_http, reply).await?;
        Ok(EventHandled::Yes)
    }
}

/// `description | steps | screenshot`, the last two optional.  `None` without a description.
fn parse_report(args: &str) -> Option<Report<'_>> {
    let mut parts = args.splitn(3, '|').map(str::trim);
    let description = parts.next().filter(|d| !d.is_empty())?;
    let steps = parts.next().filter(|s| !s.is_empty());
    let screenshot = parts.next().filter(|s| !s.is_empty());

    Some(Report {
        description,
        steps,
        screenshot,
    })
}

/// Add the achievements `report` earns to `held`.  Returns the newly added ones.
fn award(report: &Report<'_>, held: &mut BTreeSet<String>) -> Vec<&'static str> {
    let mut earned = Vec::new();

    if report.description.chars().count() >= THOROUGH_DESCRIPTION_CHARS {
        earned.push(THOROUGH_REPORTER);
    }
    if report.steps.is_some() {
        earned.push(DETAILED_STEPS);
    }
    if report.screenshot.is_some() {
        earned.push(VISUAL_EVIDENCE);
    }
    earned.retain(|achievement| held.insert((*achievement).to_owned()));

    let all_three = [THOROUGH_REPORTER, DETAILED_STEPS, VISUAL_EVIDENCE]
        .iter()
        .all(|achievement| held.contains(*achievement));
    if all_three && held.insert(DATA_DETECTIVE.to_owned()) {
        earned.push(DATA_DETECTIVE);
    }

    earned
}

fn report_role(held: &BTreeSet<String>) -> Option<&'static str> {
    if held.contains(DATA_DETECTIVE) {
        Some(DATA_DETECTIVE)
    } else if held.contains(DETAILED_STEPS) {
        Some(COMMUNITY_SUPPORTER)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_description() -> String {
        "The portal gun fires two orange portals when the left button is held. ".repeat(2)
    }

    #[test]
    fn parses_optional_sections() {
        assert_eq!(
            parse_report("crash on load | open the lab | https://img/1.png"),
            Some(Report {
                description: "crash on load",
                steps: Some("open the lab"),
                screenshot: Some("https://img/1.png"),
            })
        );
        assert_eq!(
            parse_report("crash on load ||  "),
            Some(Report {
                description: "crash on load",
                steps: None,
                screenshot: None,
            })
        );
        assert_eq!(parse_report("  | steps"), None);
    }

    #[test]
    fn short_report_earns_nothing() {
        let mut held = BTreeSet::new();
        let report = parse_report("it broke").unwrap();

        assert!(award(&report, &mut held).is_empty());
        assert_eq!(report_role(&held), None);
    }

    #[test]
    fn full_report_makes_a_data_detective() {
        let description = long_description();
        let args = format!("{} | step one | https://img/1.png", description);
        let report = parse_report(&args).unwrap();
        let mut held = BTreeSet::new();

        assert_eq!(
            award(&report, &mut held),
            vec![THOROUGH_REPORTER, DETAILED_STEPS, VISUAL_EVIDENCE, DATA_DETECTIVE]
        );
        assert_eq!(report_role(&held), Some(DATA_DETECTIVE));
    }

    #[test]
    fn achievements_accumulate_across_reports() {
        let mut held = BTreeSet::new();

        let steps_only = parse_report("broken | step one").unwrap();
        assert_eq!(award(&steps_only, &mut held), vec![DETAILED_STEPS]);
        assert_eq!(report_role(&held), Some(COMMUNITY_SUPPORTER));

        let description = long_description();
        let args = format!("{} | | https://img/2.png", description);
        let rest = parse_report(&args).unwrap();
        assert_eq!(
            award(&rest, &mut held),
            vec![THOROUGH_REPORTER, VISUAL_EVIDENCE, DATA_DETECTIVE]
        );

        // Nothing new the second time round
        assert!(award(&rest, &mut held).is_empty());
    }
}
