// src/ingest/types.rs
use anyhow::Result;

/// Which feed dialect an item came from. Drives notification styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    News,
    Video,
}

impl FeedKind {
    pub fn label(self) -> &'static str {
        match self {
            FeedKind::News => "news",
            FeedKind::Video => "video",
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Item {
    pub title: String,
    pub link: String,
    pub identifier: String,
    pub summary: Option<String>, // generic feeds only
    pub image: Option<String>,
    pub author: Option<String>, // video feeds only
}

/// Feed-shape strategy plugged into the shared watermark poller.
///
/// A dialect knows how to parse one XML shape into raw entries, which field
/// is the dedup key, and how to turn an entry into an [`Item`].
pub trait FeedDialect: Send + Sync {
    type Entry: Send;

    fn kind(&self) -> FeedKind;

    fn parse(&self, body: &str) -> Result<Vec<Self::Entry>>;

    /// Raw identifier; may be empty for malformed entries.
    fn identifier(&self, entry: &Self::Entry) -> String;

    /// Content an entry without any identifier is keyed by instead.
    fn fingerprint(&self, entry: &Self::Entry) -> String;

    fn to_item(&self, entry: Self::Entry, identifier: String) -> Item;
}

/// One pollable source with its own watermark.
#[async_trait::async_trait]
pub trait FeedAdapter: Send {
    fn name(&self) -> &str;

    fn kind(&self) -> FeedKind;

    /// Items published since the last successful poll, newest first.
    /// Never fails: fetch/parse problems are logged and yield an empty vec.
    async fn poll_for_new(&mut self) -> Vec<Item>;
}
