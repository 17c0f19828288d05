use crate::{event::*, helper::http_client, log_internal, plugin::*};
use anyhow::{anyhow, Result};
use rand::seq::SliceRandom;
use serenity::all::Mentionable;

const POLITE_COMMENTS: [&str; 3] = [
    "If I may, here is a fascinating discovery.",
    "Might I present this scientific update for your interest.",
    "Allow me to share this advancement, most enlightening indeed.",
];

/// A random top science headline.
pub struct Science;

#[derive(Debug, serde::Deserialize)]
struct Headlines {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct Article {
    title: Option<String>,
    url: Option<String>,
}

#[serenity::async_trait]
impl Plugin for Science {
    fn name(&self) -> &'static str {
        "science"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let description = "fetch the latest science news";
        Some(usage_line(ctx, self.name(), description).await)
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, _)) = event.is_bot_cmd(ctx, self.name()).await else {
            return Ok(EventHandled::No);
        };

        let typing = msg.channel_id.start_typing(ctx.http);
        let headlines = fetch_headlines(ctx).await;
        typing.stop();

        let reply = match headlines {
            Err(err) => format!("Error retrieving news: {}", err),
            Ok(articles) => {
                let picked = {
                    let mut rng = rand::thread_rng();
                    articles
                        .choose(&mut rng)
                        .cloned()
                        .zip(POLITE_COMMENTS.choose(&mut rng).copied())
                };
                match picked {
                    None => "No science news at this time, sir.".to_owned(),
                    Some((article, comment)) => format!(
                        "{}, {}\n\n**{}**\n{}",
                        msg.author.mention(),
                        comment,
                        article.title.as_deref().unwrap_or("No title"),
                        article.url.as_deref().unwrap_or("No URL"),
                    ),
                }
            }
        };

        msg.channel_id.say(ctx.cache_http, reply).await?;
        Ok(EventHandled::Yes)
    }
}

async fn fetch_headlines(ctx: &Context<'_>) -> Result<Vec<Article>> {
    let (url, api_key) = {
        let cfg = ctx.cfg.read().await;
        (cfg.news.url.clone(), cfg.news.api_key.clone())
    };
    let api_key = api_key.ok_or(anyhow!("no news API key is configured"))?;

    log_internal!("Fetching science headlines from {}", url);
    let body = http_client()?
        .get(&url)
        .query(&[
            ("category", "science"),
            ("language", "en"),
            ("apiKey", api_key.as_str()),
        ])
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    parse_headlines(&body)
}

fn parse_headlines(body: &str) -> Result<Vec<Article>> {
    let headlines: Headlines = serde_json::from_str(body)?;
    Ok(headlines.articles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_articles() {
        let body = r#"{
            "status": "ok",
            "totalResults": 2,
            "articles": [
                {"title": "Moon made of cheese after all", "url": "https://news/1", "author": null},
                {"title": null, "url": "https://news/2"}
            ]
        }"#;

        let articles = parse_headlines(body).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title.as_deref(), Some("Moon made of cheese after all"));
        assert_eq!(articles[1].title, None);
    }

    #[test]
    fn missing_articles_are_empty() {
        assert!(parse_headlines(r#"{"status": "ok"}"#).unwrap().is_empty());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_headlines("<html>rate limited</html>").is_err());
    }
}
