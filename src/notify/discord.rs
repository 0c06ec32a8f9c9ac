use super::{Notification, Notifier};
use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

// Discord rejects embeds whose title exceeds this many characters.
const EMBED_TITLE_MAX: usize = 256;

/// Posts embeds to channels through the Discord bot REST API.
#[derive(Clone)]
pub struct DiscordNotifier {
    token: String,
    api_base: String,
    client: Client,
    timeout: Duration,
}

impl DiscordNotifier {
    pub fn new(token: String) -> Self {
        Self {
            token,
            api_base: DEFAULT_API_BASE.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    fn messages_url(&self, channel_id: &str) -> String {
        format!("{}/channels/{}/messages", self.api_base, channel_id)
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, target: &str, notification: &Notification) -> Result<()> {
        let payload = DiscordMessagePayload::embed(notification);

        let rsp = self
            .client
            .post(self.messages_url(target))
            .header("Authorization", format!("Bot {}", self.token))
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .context("discord request failed")?;

        let status = rsp.status();
        if !status.is_success() {
            let body = rsp.text().await.unwrap_or_default();
            return Err(anyhow!("discord HTTP {status}: {body}"));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct EmbedImage {
    url: String,
}

#[derive(Serialize)]
struct EmbedAuthor {
    name: String,
}

#[derive(Serialize)]
struct EmbedFooter {
    text: String,
}

#[derive(Serialize)]
struct DiscordEmbed {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<EmbedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<EmbedAuthor>,
    footer: EmbedFooter,
}

#[derive(Serialize)]
struct DiscordMessagePayload {
    embeds: Vec<DiscordEmbed>,
}

impl DiscordMessagePayload {
    fn embed(n: &Notification) -> Self {
        let title = if n.title.chars().count() > EMBED_TITLE_MAX {
            let mut t: String = n.title.chars().take(EMBED_TITLE_MAX - 3).collect();
            t.push_str("...");
            t
        } else {
            n.title.clone()
        };
        Self {
            embeds: vec![DiscordEmbed {
                title,
                // An empty url makes Discord reject the whole message.
                url: Some(n.url.clone()).filter(|u| !u.is_empty()),
                color: n.color,
                image: n.image.clone().map(|url| EmbedImage { url }),
                author: n.author.clone().map(|name| EmbedAuthor { name }),
                footer: EmbedFooter {
                    text: n.footer.clone(),
                },
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::FeedKind;

    fn notification() -> Notification {
        Notification {
            kind: FeedKind::Video,
            title: "Video 1".into(),
            url: "https://yt.com/v1".into(),
            color: 0xff0000,
            image: Some("https://thumb.jpg".into()),
            author: Some("My Channel".into()),
            footer: "New video".into(),
        }
    }

    #[test]
    fn embed_payload_shape() {
        let v = serde_json::to_value(DiscordMessagePayload::embed(&notification())).unwrap();
        let e = &v["embeds"][0];
        assert_eq!(e["title"], "Video 1");
        assert_eq!(e["url"], "https://yt.com/v1");
        assert_eq!(e["color"], 0xff0000);
        assert_eq!(e["image"]["url"], "https://thumb.jpg");
        assert_eq!(e["author"]["name"], "My Channel");
        assert_eq!(e["footer"]["text"], "New video");
    }

    #[test]
    fn empty_optional_fields_are_omitted() {
        let mut n = notification();
        n.url.clear();
        n.image = None;
        n.author = None;
        let v = serde_json::to_value(DiscordMessagePayload::embed(&n)).unwrap();
        let e = &v["embeds"][0];
        assert!(e.get("url").is_none());
        assert!(e.get("image").is_none());
        assert!(e.get("author").is_none());
    }

    #[test]
    fn long_titles_are_cut_to_discord_limit() {
        let mut n = notification();
        n.title = "x".repeat(400);
        let p = DiscordMessagePayload::embed(&n);
        assert_eq!(p.embeds[0].title.chars().count(), EMBED_TITLE_MAX);
    }

    #[test]
    fn api_base_trailing_slash_is_trimmed() {
        let d = DiscordNotifier::new("t".into()).with_api_base("http://localhost:1/api/");
        assert_eq!(d.messages_url("42"), "http://localhost:1/api/channels/42/messages");
    }
}
