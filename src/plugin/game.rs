use crate::{event::*, helper::http_client, log_internal, plugin::*};
use anyhow::Result;

const STORE_SEARCH_URL: &str = "https://store.steampowered.com/api/storesearch/";

/// Steam store lookup by name.
pub struct Game;

#[derive(Debug, serde::Deserialize)]
struct SearchResults {
    #[serde(default)]
    items: Vec<StoreItem>,
}

#[derive(Debug, serde::Deserialize)]
struct StoreItem {
    id: u64,
    name: String,
    price: Option<Price>,
}

/// Amounts are in cents.
#[derive(Debug, serde::Deserialize)]
struct Price {
    currency: String,
    initial: u64,
    #[serde(rename = "final")]
    current: u64,
}

#[serenity::async_trait]
impl Plugin for Game {
    fn name(&self) -> &'static str {
        "game"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let description = "<name> - look a game up on Steam";
        Some(usage_line(ctx, self.name(), description).await)
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, name)) = event.is_bot_cmd(ctx, self.name()).await else {
            return Ok(EventHandled::No);
        };
        if name.is_empty() {
            let usage = self.usage(ctx).await.unwrap_or_default();
            msg.reply(ctx.cache_http, format!("Usage: `{}`", usage))
                .await?;
            return Ok(EventHandled::Yes);
        }

        let typing = msg.channel_id.start_typing(ctx.http);
        let found = search(name).await;
        typing.stop();

        let reply = match found {
            Ok(Some(item)) => describe(&item),
            Ok(None) => format!("I could not find a game called \"{}\", I'm afraid.", name),
            Err(err) => format!("Error searching the Steam store: {}", err),
        };
        msg.reply(ctx.cache_http, reply).await?;
        Ok(EventHandled::Yes)
    }
}

/// First store hit for `term`.
async fn search(term: &str) -> Result<Option<StoreItem>> {
    log_internal!("Searching the Steam store for `{}`", term);
    let body = http_client()?
        .get(STORE_SEARCH_URL)
        .query(&[("term", term), ("l", "english"), ("cc", "US")])
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    first_hit(&body)
}

fn first_hit(body: &str) -> Result<Option<StoreItem>> {
    let results: SearchResults = serde_json::from_str(body)?;
    Ok(results.items.into_iter().next())
}

fn format_price(price: Option<&Price>) -> String {
    let Some(price) = price else {
        return "Free".to_owned();
    };
    let amount = |cents: u64| format!("{}.{:02} {}", cents / 100, cents % 100, price.currency);

    if price.current < price.initial {
        let discount = ((price.initial - price.current) * 100 + price.initial / 2) / price.initial;
        format!(
            "{} (was {}, -{}%)",
            amount(price.current),
            amount(price.initial),
            discount
        )
    } else {
        amount(price.current)
    }
}

fn describe(item: &StoreItem) -> String {
    format!(
        "**{}**\nPrice: {}\nhttps://store.steampowered.com/app/{}/",
        item.name,
        format_price(item.price.as_ref()),
        item.id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(initial: u64, current: u64) -> Price {
        Price {
            currency: "USD".to_owned(),
            initial,
            current,
        }
    }

    #[test]
    fn prices() {
        assert_eq!(format_price(None), "Free");
        assert_eq!(format_price(Some(&price(999, 999))), "9.99 USD");
        assert_eq!(format_price(Some(&price(1000, 250))), "2.50 USD (was 10.00 USD, -75%)");
    }

    #[test]
    fn takes_the_first_hit() {
        let body = r#"{
            "total": 2,
            "items": [
                {"type": "app", "name": "Portal 2", "id": 620,
                 "price": {"currency": "USD", "initial": 999, "final": 199}},
                {"type": "app", "name": "Portal", "id": 400}
            ]
        }"#;

        let item = first_hit(body).unwrap().unwrap();
        assert_eq!(item.name, "Portal 2");
        assert_eq!(
            describe(&item),
            "**Portal 2**\nPrice: 1.99 USD (was 9.99 USD, -80%)\nhttps://store.steampowered.com/app/620/"
        );
    }

    #[test]
    fn no_hits() {
        assert!(first_hit(r#"{"total": 0, "items": []}"#).unwrap().is_none());
    }
}
