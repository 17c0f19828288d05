use crate::{event::*, log_internal, plugin::*};
use anyhow::Result;

/// Starts background work once the connection to Discord is ready.
pub struct Ready;

#[serenity::async_trait]
impl Plugin for Ready {
    fn name(&self) -> &'static str {
        "ready"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        None
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::Ready(_) = event else {
            return Ok(EventHandled::No);
        };

        // Ready fires again on every reconnect.
        let first_ready = {
            let mut vstate = ctx.vstate.write().await;
            !std::mem::replace(&mut vstate.silence_watch_started, true)
        };

        if first_ready {
            log_internal!("Starting silence watcher");
            tokio::spawn(super::creepy::watch_silence(
                ctx.cfg.clone(),
                ctx.vstate.clone(),
                ctx.http.clone(),
            ));
        }

        Ok(EventHandled::Yes)
    }
}
