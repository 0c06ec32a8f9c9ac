// src/ingest/providers/youtube.rs
//! YouTube channel feeds (Atom with `yt:` and `media:` extensions).

use std::sync::Arc;

use anyhow::{bail, Result};

use super::{alternate_href, parse_tree, AtomLink, XmlNode};
use crate::ingest::fetch::FeedFetcher;
use crate::ingest::media::{MediaAttrs, MediaField};
use crate::ingest::poller::WatermarkPoller;
use crate::ingest::scrub_html_entities_for_xml;
use crate::ingest::types::{FeedDialect, FeedKind, Item};
use crate::state::WatermarkStore;

pub const YOUTUBE_FEED_BASE: &str = "https://www.youtube.com/feeds/videos.xml";
pub const VIDEO_TITLE_PLACEHOLDER: &str = "New Video";
pub const VIDEO_AUTHOR_PLACEHOLDER: &str = "YouTube Channel";

pub fn channel_feed_url(channel_id: &str) -> String {
    format!("{YOUTUBE_FEED_BASE}?channel_id={}", channel_id.trim())
}

/// One `<entry>` of a channel feed.
#[derive(Debug, Clone)]
pub struct VideoEntry {
    id: Option<String>,
    video_id: Option<String>,
    title: Option<String>,
    links: Vec<AtomLink>,
    author: Option<String>,
    thumbnails: Vec<MediaAttrs>,
}

impl VideoEntry {
    fn from_node(entry: &XmlNode) -> Self {
        let owned = |s: Option<&str>| s.map(String::from);
        Self {
            id: owned(entry.child_text("id")),
            video_id: owned(entry.child_text("yt:videoId")),
            title: owned(entry.child_text("title")),
            links: entry.children_named("link").map(AtomLink::from).collect(),
            author: owned(entry.child("author").and_then(|a| a.child_text("name"))),
            thumbnails: entry
                .children_named("media:group")
                .flat_map(|g| g.children_named("media:thumbnail"))
                .map(MediaAttrs::from)
                .collect(),
        }
    }

    fn thumbnail(&self) -> MediaField {
        MediaField::from_attrs(self.thumbnails.clone())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YoutubeDialect;

impl YoutubeDialect {
    pub fn parse_entries(body: &str) -> Result<Vec<VideoEntry>> {
        let xml = scrub_html_entities_for_xml(body);
        let root = parse_tree(&xml)?;
        if root.local_name() != "feed" {
            bail!("expected an atom <feed>, got <{}>", root.name);
        }
        Ok(root
            .children_named("entry")
            .map(VideoEntry::from_node)
            .collect())
    }
}

impl FeedDialect for YoutubeDialect {
    type Entry = VideoEntry;

    fn kind(&self) -> FeedKind {
        FeedKind::Video
    }

    fn parse(&self, body: &str) -> Result<Vec<VideoEntry>> {
        Self::parse_entries(body)
    }

    fn identifier(&self, entry: &VideoEntry) -> String {
        entry
            .id
            .clone()
            .or_else(|| entry.video_id.clone())
            .unwrap_or_default()
    }

    fn fingerprint(&self, entry: &VideoEntry) -> String {
        format!(
            "{}|{}",
            entry.title.as_deref().unwrap_or_default(),
            alternate_href(&entry.links).unwrap_or_default()
        )
    }

    fn to_item(&self, entry: VideoEntry, identifier: String) -> Item {
        let image = entry.thumbnail().first_url();
        let link = alternate_href(&entry.links).unwrap_or_default();
        Item {
            title: entry
                .title
                .unwrap_or_else(|| VIDEO_TITLE_PLACEHOLDER.to_string()),
            link,
            identifier,
            summary: None,
            image,
            author: Some(
                entry
                    .author
                    .unwrap_or_else(|| VIDEO_AUTHOR_PLACEHOLDER.to_string()),
            ),
        }
    }
}

pub type VideoFeedAdapter = WatermarkPoller<YoutubeDialect>;

impl WatermarkPoller<YoutubeDialect> {
    /// Adapter for one channel; the feed URL is derived from `channel_id`.
    pub fn youtube(
        channel_id: &str,
        fetcher: Arc<dyn FeedFetcher>,
        store: WatermarkStore,
    ) -> Self {
        Self::with_dialect(
            format!("youtube:{}", channel_id.trim()),
            channel_feed_url(channel_id),
            YoutubeDialect,
            fetcher,
            store,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(xml: &str) -> Vec<Item> {
        let d = YoutubeDialect;
        d.parse(xml)
            .unwrap()
            .into_iter()
            .map(|e| {
                let id = d.identifier(&e);
                d.to_item(e, id)
            })
            .collect()
    }

    #[test]
    fn channel_url_is_templated() {
        assert_eq!(
            channel_feed_url("UC123"),
            "https://www.youtube.com/feeds/videos.xml?channel_id=UC123"
        );
    }

    #[test]
    fn extracts_single_thumbnail_from_media_group() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/" xmlns="http://www.w3.org/2005/Atom">
  <link rel="self" href="http://www.youtube.com/feeds/videos.xml?channel_id=UC1"/>
  <id>yt:channel:UC1</id>
  <title>My Channel</title>
  <entry>
    <id>yt:video:123</id>
    <yt:videoId>123</yt:videoId>
    <title>Video 1</title>
    <link rel="alternate" href="http://yt.com/v1"/>
    <author><name>My Channel</name><uri>https://www.youtube.com/channel/UC1</uri></author>
    <media:group>
      <media:title>Video 1</media:title>
      <media:content url="https://www.youtube.com/v/123" type="application/x-shockwave-flash" width="640" height="390"/>
      <media:thumbnail url="http://thumb.jpg" width="480" height="360"/>
      <media:description>desc</media:description>
    </media:group>
  </entry>
</feed>"#;
        let got = items(xml);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].title, "Video 1");
        assert_eq!(got[0].link, "http://yt.com/v1");
        assert_eq!(got[0].identifier, "yt:video:123");
        assert_eq!(got[0].image.as_deref(), Some("http://thumb.jpg"));
        assert_eq!(got[0].author.as_deref(), Some("My Channel"));
        assert_eq!(got[0].summary, None);
    }

    #[test]
    fn thumbnail_collection_takes_first() {
        let xml = r#"<feed xmlns:media="http://search.yahoo.com/mrss/">
  <entry>
    <id>v2</id>
    <media:group>
      <media:thumbnail url="http://thumb-hq.jpg"/>
      <media:thumbnail url="http://thumb-lq.jpg"/>
    </media:group>
  </entry>
</feed>"#;
        assert_eq!(items(xml)[0].image.as_deref(), Some("http://thumb-hq.jpg"));
    }

    #[test]
    fn missing_pieces_fall_back() {
        let xml = r#"<feed><entry><yt:videoId>abc</yt:videoId></entry></feed>"#;
        let got = items(xml);
        assert_eq!(got[0].identifier, "abc");
        assert_eq!(got[0].title, VIDEO_TITLE_PLACEHOLDER);
        assert_eq!(got[0].author.as_deref(), Some(VIDEO_AUTHOR_PLACEHOLDER));
        assert_eq!(got[0].link, "");
        assert_eq!(got[0].image, None);
    }

    #[test]
    fn media_group_without_thumbnail_is_not_an_error() {
        let xml = r#"<feed><entry><id>v3</id><media:group><media:title>t</media:title></media:group></entry></feed>"#;
        assert_eq!(items(xml)[0].image, None);
    }

    #[test]
    fn link_is_not_an_identifier_fallback() {
        let xml = r#"<feed><entry><title>t</title><link href="http://yt.com/x"/></entry></feed>"#;
        assert_eq!(items(xml)[0].identifier, "");
    }
    #[test]
    fn prefixes_are_matched_by_namespace() {
        let xml = r#"<a:feed xmlns:a="http://www.w3.org/2005/Atom" xmlns:y="http://www.youtube.com/xml/schemas/2015" xmlns:m="http://search.yahoo.com/mrss/">
  <a:entry>
    <y:videoId>vid9</y:videoId>
    <a:title>Nine</a:title>
    <m:group><m:thumbnail url="http://nine.jpg"/></m:group>
  </a:entry>
</a:feed>"#;
        let got = items(xml);
        assert_eq!(got[0].identifier, "vid9");
        assert_eq!(got[0].title, "Nine");
        assert_eq!(got[0].image.as_deref(), Some("http://nine.jpg"));
    }

    #[test]
    fn non_atom_body_is_an_error() {
        assert!(YoutubeDialect::parse_entries("<rss><channel/></rss>").is_err());
        assert!(YoutubeDialect::parse_entries("").is_err());
    }
}
