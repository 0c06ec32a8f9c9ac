//! feedcast binary entrypoint.
//! Loads config, starts the broadcast scheduler and serves the liveness router.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedcast::ingest::fetch::{FeedFetcher, HttpFetcher};
use feedcast::ingest::providers::news::NewsFeedAdapter;
use feedcast::ingest::providers::youtube::VideoFeedAdapter;
use feedcast::metrics::Metrics;
use feedcast::notify::discord::DiscordNotifier;
use feedcast::notify::NotificationStyle;
use feedcast::{
    api, AppConfig, Broadcaster, DestinationRegistry, FeedAdapter, Scheduler, WatermarkStore,
};

/// `LOG_FORMAT=json` switches to JSON lines; compact text otherwise.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("feedcast=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

fn build_adapters(cfg: &AppConfig, fetcher: Arc<dyn FeedFetcher>) -> Vec<Box<dyn FeedAdapter>> {
    let mut adapters: Vec<Box<dyn FeedAdapter>> = Vec::new();
    if let Some(url) = cfg.rss_url.as_deref() {
        let store = WatermarkStore::open(cfg.news_state_path());
        adapters.push(Box::new(NewsFeedAdapter::news(url, fetcher.clone(), store)));
    }
    if let Some(channel) = cfg.youtube_channel_id.as_deref() {
        let store = WatermarkStore::open(cfg.youtube_state_path());
        adapters.push(Box::new(VideoFeedAdapter::youtube(channel, fetcher, store)));
    }
    adapters
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the subscriber so RUST_LOG / LOG_FORMAT from it apply.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("startup config: {e:#}");
            std::process::exit(1);
        }
    };
    tracing::info!(config = ?cfg, "config loaded");

    if let Some(link) = cfg.invite_link() {
        tracing::info!(%link, "invite the bot with this link");
    }

    let metrics = Metrics::init(cfg.poll_interval_secs)?;

    let fetcher: Arc<dyn FeedFetcher> =
        Arc::new(HttpFetcher::new(Duration::from_secs(cfg.http_timeout_secs))?);
    let adapters = build_adapters(&cfg, fetcher);

    let registry = Arc::new(DestinationRegistry::open(cfg.subscriptions_path()));

    let notifier = DiscordNotifier::new(cfg.discord_token.clone())
        .with_api_base(cfg.discord_api_base.clone())
        .with_timeout(cfg.http_timeout_secs);
    let style = NotificationStyle {
        news_footer: cfg.news_footer.clone(),
        video_footer: cfg.video_footer.clone(),
    };
    let broadcaster =
        Broadcaster::new(Arc::new(notifier), style).with_max_in_flight(cfg.delivery_concurrency);

    let scheduler = Scheduler::new(adapters, broadcaster, registry)
        .with_interval(Duration::from_secs(cfg.poll_interval_secs));
    let cycles = scheduler.spawn();

    let app = api::router_with_metrics(&metrics);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cfg.http_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(%addr, "http listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await
        .context("http server")?;

    cycles.abort();
    Ok(())
}
