use crate::{
    context::Context,
    event::{Event, EventHandled},
};
use anyhow::Result;

mod ask_gpt;
mod bug_report;
mod chat;
mod creepy;
mod debug;
mod experiment;
mod fun;
mod game;
mod help;
mod ignore_bots;
mod llm_reply;
mod music;
mod rank;
mod ready;
mod reload;
mod riddle;
mod science;
mod title;
mod welcome;

#[serenity::async_trait]
pub trait Plugin: Sync + Send {
    /// Plugin name.  Also the command name for command plugins.
    fn name(&self) -> &'static str;
    /// Help message line(s).  None if no help message
    async fn usage(&self, ctx: &Context) -> Option<String>;
    /// Potentially handle event.  Returns:
    /// - Ok(EventHandled::Yes) if the event has been handled and no other plugin should attempt to
    /// handle it
    /// - Ok(EventHandled::No) if another plugin should attempt to handle the event
    /// - Err if an error occurred
    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled>;
}

/// `;name - description` with the configured prefix.
async fn usage_line(ctx: &Context<'_>, name: &str, description: &str) -> String {
    let prefix = &ctx.cfg.read().await.general.command_prefix;
    format!("{}{} - {}", prefix, name, description)
}

/// Ordered list of available plugins
pub fn plugins() -> Vec<Box<dyn Plugin>> {
    vec![
        // Core bot operations
        Box::new(debug::Debug),
        Box::new(ignore_bots::IgnoreBots),
        Box::new(ready::Ready),
        Box::new(welcome::Welcome),
        // Passive message watchers.  These never claim the event.
        Box::new(rank::Rank),
        Box::new(creepy::Creepy),
        // Commands
        Box::new(help::Help),
        Box::new(reload::Reload),
        Box::new(experiment::Experiment),
        Box::new(riddle::Riddle),
        Box::new(title::Title),
        Box::new(bug_report::BugReport),
        Box::new(chat::Chat),
        Box::new(fun::Info),
        Box::new(fun::CakeOrLie),
        Box::new(fun::CompanionCube),
        Box::new(fun::Toxin),
        Box::new(science::Science),
        Box::new(game::Game),
        Box::new(ask_gpt::AskGpt),
        Box::new(music::Music),
        // LLM fallback, used if no other plugin handles the event.
        // Keep last.
        Box::new(llm_reply::LlmReply),
    ]
}
