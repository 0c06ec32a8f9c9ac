// src/ingest/providers/news.rs
//! Generic RSS 2.0 / RSS 1.0 / Atom news feeds.

use std::sync::Arc;

use anyhow::{bail, Result};

use super::{alternate_href, enclosure_links, parse_tree, AtomLink, XmlNode};
use crate::ingest::fetch::FeedFetcher;
use crate::ingest::media::{image_enclosure, MediaAttrs, MediaField};
use crate::ingest::poller::WatermarkPoller;
use crate::ingest::types::{FeedDialect, FeedKind, Item};
use crate::ingest::{scrub_html_entities_for_xml, summarize};
use crate::state::WatermarkStore;

pub const NEWS_TITLE_PLACEHOLDER: &str = "Untitled";

/// Shape-neutral news entry produced by [`NewsDialect::parse`].
#[derive(Debug, Clone)]
pub struct NewsEntry {
    pub guid: Option<String>,
    pub link: Option<String>,
    pub title: Option<String>,
    pub raw_summary: Option<String>,
    pub media: MediaField,
    /// `(mime, url)` pairs.
    pub enclosures: Vec<(Option<String>, Option<String>)>,
}

fn owned(s: Option<&str>) -> Option<String> {
    s.map(String::from)
}

/// `<media:content>` directly on the entry and inside `<media:group>`.
fn media_contents(entry: &XmlNode) -> Vec<MediaAttrs> {
    entry
        .children_named("media:content")
        .chain(
            entry
                .children_named("media:group")
                .flat_map(|g| g.children_named("media:content")),
        )
        .map(MediaAttrs::from)
        .collect()
}

impl NewsEntry {
    fn from_rss_item(item: &XmlNode) -> Self {
        let raw_summary = item
            .child_text("description")
            .or_else(|| item.child_text("content:encoded"));
        Self {
            guid: owned(item.child_text("guid")),
            link: owned(item.child_text("link")),
            title: owned(item.child_text("title")),
            raw_summary: owned(raw_summary),
            media: MediaField::from_attrs(media_contents(item)),
            enclosures: item
                .children_named("enclosure")
                .map(|e| (owned(e.attr("type")), owned(e.attr("url"))))
                .collect(),
        }
    }

    fn from_atom_entry(entry: &XmlNode) -> Self {
        let links: Vec<AtomLink> = entry.children_named("link").map(AtomLink::from).collect();
        let raw_summary = entry
            .child_text("summary")
            .or_else(|| entry.child_text("content"));
        Self {
            guid: owned(entry.child_text("id")),
            link: alternate_href(&links),
            title: owned(entry.child_text("title")),
            raw_summary: owned(raw_summary),
            media: MediaField::from_attrs(media_contents(entry)),
            enclosures: enclosure_links(&links)
                .map(|l| (l.mime.clone(), l.href.clone()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NewsDialect;

impl NewsDialect {
    pub fn parse_entries(body: &str) -> Result<Vec<NewsEntry>> {
        let xml = scrub_html_entities_for_xml(body);
        let root = parse_tree(&xml)?;
        let entries = match root.local_name() {
            "rss" => root
                .children_named("channel")
                .flat_map(|c| c.children_named("item"))
                .map(NewsEntry::from_rss_item)
                .collect(),
            // RSS 1.0: items are siblings of `<channel>` under `<rdf:RDF>`.
            "RDF" => root
                .children_named("item")
                .map(NewsEntry::from_rss_item)
                .collect(),
            "feed" => root
                .children_named("entry")
                .map(NewsEntry::from_atom_entry)
                .collect(),
            other => bail!("unsupported feed root <{other}>"),
        };
        Ok(entries)
    }
}

impl FeedDialect for NewsDialect {
    type Entry = NewsEntry;

    fn kind(&self) -> FeedKind {
        FeedKind::News
    }

    fn parse(&self, body: &str) -> Result<Vec<NewsEntry>> {
        Self::parse_entries(body)
    }

    fn identifier(&self, entry: &NewsEntry) -> String {
        entry
            .guid
            .clone()
            .or_else(|| entry.link.clone())
            .unwrap_or_default()
    }

    fn fingerprint(&self, entry: &NewsEntry) -> String {
        format!(
            "{}|{}",
            entry.title.as_deref().unwrap_or_default(),
            entry.raw_summary.as_deref().unwrap_or_default()
        )
    }

    fn to_item(&self, entry: NewsEntry, identifier: String) -> Item {
        let image = entry.media.preferred_image().or_else(|| {
            image_enclosure(
                entry
                    .enclosures
                    .iter()
                    .map(|(mime, url)| (mime.as_deref(), url.as_deref())),
            )
        });
        Item {
            title: entry
                .title
                .unwrap_or_else(|| NEWS_TITLE_PLACEHOLDER.to_string()),
            link: entry.link.unwrap_or_default(),
            identifier,
            summary: Some(summarize(entry.raw_summary.as_deref())),
            image,
            author: None,
        }
    }
}

pub type NewsFeedAdapter = WatermarkPoller<NewsDialect>;

impl WatermarkPoller<NewsDialect> {
    pub fn news(
        url: impl Into<String>,
        fetcher: Arc<dyn FeedFetcher>,
        store: WatermarkStore,
    ) -> Self {
        Self::with_dialect("news", url, NewsDialect, fetcher, store)
    }
}
