pub mod broadcast;
pub mod discord;

use anyhow::Result;
use std::collections::HashSet;
use std::sync::Mutex;

use crate::ingest::types::{FeedKind, Item};

pub use broadcast::{Broadcaster, DeliveryFailure, DeliveryReport};

pub const NEWS_COLOR: u32 = 0x00ff00;
pub const VIDEO_COLOR: u32 = 0xff0000;
pub const DEFAULT_NEWS_FOOTER: &str = "Fresh from the news feed";
pub const DEFAULT_VIDEO_FOOTER: &str = "New video on YouTube";

/// What a destination receives for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: FeedKind,
    pub title: String,
    pub url: String,
    pub color: u32,
    pub image: Option<String>,
    pub author: Option<String>,
    pub footer: String,
}

/// Per-kind footer labels.
#[derive(Debug, Clone)]
pub struct NotificationStyle {
    pub news_footer: String,
    pub video_footer: String,
}

impl Default for NotificationStyle {
    fn default() -> Self {
        Self {
            news_footer: DEFAULT_NEWS_FOOTER.to_string(),
            video_footer: DEFAULT_VIDEO_FOOTER.to_string(),
        }
    }
}

impl NotificationStyle {
    pub fn notification(&self, kind: FeedKind, item: &Item) -> Notification {
        let (color, footer) = match kind {
            FeedKind::News => (NEWS_COLOR, &self.news_footer),
            FeedKind::Video => (VIDEO_COLOR, &self.video_footer),
        };
        Notification {
            kind,
            title: item.title.clone(),
            url: item.link.clone(),
            color,
            image: item.image.clone(),
            author: match kind {
                FeedKind::Video => item.author.clone(),
                FeedKind::News => None,
            },
            footer: footer.clone(),
        }
    }
}

/// Transport seam: deliver one notification to one target channel.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, target: &str, notification: &Notification) -> Result<()>;
}

// --- Test helper ---
/// Records every send; targets listed in `failing` return an error.
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, Notification)>>,
    pub failing: HashSet<String>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(vec![]),
            failing: HashSet::new(),
        }
    }

    pub fn failing_for<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sent: Mutex::new(vec![]),
            failing: targets.into_iter().map(Into::into).collect(),
        }
    }

    pub fn targets(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(t, _)| t.clone())
            .collect()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, target: &str, notification: &Notification) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((target.to_string(), notification.clone()));
        if self.failing.contains(target) {
            anyhow::bail!("channel {target} unavailable");
        }
        Ok(())
    }
}
