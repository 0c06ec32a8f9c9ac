// tests/http_transports.rs
use std::time::Duration;

use feedcast::ingest::fetch::{FeedFetcher, HttpFetcher};
use feedcast::notify::discord::DiscordNotifier;
use feedcast::{FeedKind, Notification, Notifier};
use httpmock::prelude::*;

fn notification() -> Notification {
    Notification {
        kind: FeedKind::News,
        title: "Patch 1.3 lands today".into(),
        url: "https://news.example.com/patch-1-3".into(),
        color: 0x00ff00,
        image: None,
        author: None,
        footer: "Fresh from the news feed".into(),
    }
}

#[tokio::test]
async fn fetcher_returns_body_on_success() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET).path("/feed.xml");
            then.status(200)
                .header("content-type", "application/rss+xml")
                .body("<rss/>");
        })
        .await;

    let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
    let body = fetcher.fetch(&server.url("/feed.xml")).await.unwrap();
    assert_eq!(body, "<rss/>");
    m.assert_async().await;
}

#[tokio::test]
async fn fetcher_treats_non_2xx_as_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/gone.xml");
            then.status(404).body("Not Found");
        })
        .await;

    let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
    assert!(fetcher.fetch(&server.url("/gone.xml")).await.is_err());
}

#[tokio::test]
async fn discord_posts_with_bot_auth() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/channels/chan-1/messages")
                .header("Authorization", "Bot tok-123");
            then.status(200).body("{}");
        })
        .await;

    let notifier = DiscordNotifier::new("tok-123".into()).with_api_base(server.base_url());
    notifier.send("chan-1", &notification()).await.unwrap();
    m.assert_async().await;
}

#[tokio::test]
async fn discord_error_status_surfaces_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/channels/chan-x/messages");
            then.status(403).body("Missing Access");
        })
        .await;

    let notifier = DiscordNotifier::new("tok".into()).with_api_base(server.base_url());
    let err = notifier
        .send("chan-x", &notification())
        .await
        .unwrap_err()
        .to_string();
    assert!(err.contains("403"), "{err}");
    assert!(err.contains("Missing Access"), "{err}");
}
