// src/ingest/poller.rs
//! The watermark scan shared by every feed dialect.

use std::sync::Arc;

use metrics::{counter, histogram};

use crate::ingest::fetch::FeedFetcher;
use crate::ingest::synthetic_identifier;
use crate::ingest::types::{FeedAdapter, FeedDialect, FeedKind, Item};
use crate::state::WatermarkStore;

/// Result of comparing a feed page against the stored watermark.
#[derive(Debug, PartialEq, Eq)]
pub enum Scan {
    /// Newest identifier equals the watermark; nothing scanned.
    UpToDate,
    /// Entries `[0, new_count)` are new; `latest_id` is the newest identifier.
    New { new_count: usize, latest_id: String },
}

/// Core "what's new" rule over identifiers ordered newest first.
///
/// Stops at the first identifier equal to `watermark`. With no watermark the
/// whole page counts as new. An empty page is reported as up to date.
pub fn scan_new(ids: &[String], watermark: Option<&str>) -> Scan {
    let Some(latest) = ids.first() else {
        return Scan::UpToDate;
    };
    if Some(latest.as_str()) == watermark {
        return Scan::UpToDate;
    }
    let new_count = ids
        .iter()
        .position(|id| Some(id.as_str()) == watermark)
        .unwrap_or(ids.len());
    Scan::New {
        new_count,
        latest_id: latest.clone(),
    }
}

/// Adapter = dialect + fetcher + watermark.
pub struct WatermarkPoller<D: FeedDialect> {
    name: String,
    url: String,
    dialect: D,
    fetcher: Arc<dyn FeedFetcher>,
    store: WatermarkStore,
}

impl<D: FeedDialect> WatermarkPoller<D> {
    pub fn with_dialect(
        name: impl Into<String>,
        url: impl Into<String>,
        dialect: D,
        fetcher: Arc<dyn FeedFetcher>,
        store: WatermarkStore,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            dialect,
            fetcher,
            store,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn watermark(&self) -> &WatermarkStore {
        &self.store
    }

    async fn fetch_entries(&self) -> anyhow::Result<Vec<D::Entry>> {
        let t0 = std::time::Instant::now();
        let body = self.fetcher.fetch(&self.url).await?;
        let entries = self.dialect.parse(&body)?;
        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("feed_fetch_ms", "feed" => self.dialect.kind().label()).record(ms);
        Ok(entries)
    }

    fn identifier_of(&self, entry: &D::Entry) -> String {
        let id = self.dialect.identifier(entry);
        if !id.is_empty() {
            return id;
        }
        // Malformed entry: derive a stable key from what it does carry.
        synthetic_identifier(&self.dialect.fingerprint(entry))
    }

    pub async fn poll(&mut self) -> Vec<Item> {
        crate::ingest::ensure_metrics_described();
        let kind = self.dialect.kind().label();
        counter!("feed_polls_total", "feed" => kind).increment(1);

        let entries = match self.fetch_entries().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = ?e, feed = %self.name, url = %self.url, "feed poll failed");
                counter!("feed_poll_errors_total", "feed" => kind).increment(1);
                return Vec::new();
            }
        };
        if entries.is_empty() {
            tracing::debug!(feed = %self.name, "feed has no entries");
            return Vec::new();
        }

        // Fast path: only the head needs an identifier when nothing changed.
        let watermark = self.store.load().map(str::to_string);
        let head_id = self.identifier_of(&entries[0]);
        if Some(head_id.as_str()) == watermark.as_deref() {
            tracing::debug!(feed = %self.name, watermark = %head_id, "no new items");
            return Vec::new();
        }

        let mut ids = Vec::with_capacity(entries.len());
        ids.push(head_id);
        for entry in &entries[1..] {
            let id = self.identifier_of(entry);
            let hit = Some(id.as_str()) == watermark.as_deref();
            ids.push(id);
            if hit {
                break;
            }
        }

        let Scan::New {
            new_count,
            latest_id,
        } = scan_new(&ids, watermark.as_deref())
        else {
            return Vec::new();
        };

        let items: Vec<Item> = entries
            .into_iter()
            .zip(ids)
            .take(new_count)
            .map(|(entry, id)| self.dialect.to_item(entry, id))
            .collect();

        if !items.is_empty() {
            if let Err(e) = self.store.save(&latest_id) {
                tracing::error!(feed = %self.name, "watermark not advanced: {e:#}");
                counter!("watermark_write_errors_total", "feed" => kind).increment(1);
            }
        }

        counter!("feed_new_items_total", "feed" => kind).increment(items.len() as u64);
        tracing::info!(feed = %self.name, new = items.len(), latest = %latest_id, "feed polled");
        items
    }
}

#[async_trait::async_trait]
impl<D> FeedAdapter for WatermarkPoller<D>
where
    D: FeedDialect + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> FeedKind {
        self.dialect.kind()
    }

    async fn poll_for_new(&mut self) -> Vec<Item> {
        self.poll().await
    }
}
