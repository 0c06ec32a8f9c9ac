// src/ingest/media.rs
//! Normalization of optional media substructures.
//!
//! Feeds list `media:content` / `media:thumbnail` zero, one or many times.
//! Parsers collect whatever they saw into a `Vec<MediaAttrs>`; [`MediaField`]
//! turns that into an explicit shape so URL selection does not have to
//! branch on raw XML at every call site.

/// Attributes shared by `media:content`, `media:thumbnail` and enclosures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaAttrs {
    pub url: Option<String>,
    pub medium: Option<String>,
    pub mime: Option<String>,
}

/// One normalized media entry; `url` is `None` when missing or blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub url: Option<String>,
    pub medium: Option<String>,
}

impl MediaRef {
    fn from_attrs(attrs: MediaAttrs) -> Self {
        let url = attrs
            .url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        Self {
            url,
            medium: attrs.medium,
        }
    }

    fn is_image(&self) -> bool {
        self.medium
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("image"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaField {
    Absent,
    Single(MediaRef),
    Collection(Vec<MediaRef>),
}

impl MediaField {
    pub fn from_attrs(mut list: Vec<MediaAttrs>) -> Self {
        match list.len() {
            0 => MediaField::Absent,
            1 => MediaField::Single(MediaRef::from_attrs(list.remove(0))),
            _ => MediaField::Collection(list.into_iter().map(MediaRef::from_attrs).collect()),
        }
    }

    /// Image pick for `media:content`: an entry marked `medium="image"` wins,
    /// otherwise any entry with a URL.
    pub fn preferred_image(&self) -> Option<String> {
        match self {
            MediaField::Absent => None,
            MediaField::Single(m) => m.url.clone(),
            MediaField::Collection(list) => list
                .iter()
                .find(|m| m.is_image() && m.url.is_some())
                .or_else(|| list.iter().find(|m| m.url.is_some()))
                .and_then(|m| m.url.clone()),
        }
    }

    /// Thumbnail pick: feeds list resolutions largest first, so take the head.
    pub fn first_url(&self) -> Option<String> {
        match self {
            MediaField::Absent => None,
            MediaField::Single(m) => m.url.clone(),
            MediaField::Collection(list) => list.first().and_then(|m| m.url.clone()),
        }
    }
}

/// Enclosure fallback: first enclosure whose MIME type starts with `image`.
pub fn image_enclosure<'a, I>(enclosures: I) -> Option<String>
where
    I: IntoIterator<Item = (Option<&'a str>, Option<&'a str>)>,
{
    enclosures
        .into_iter()
        .find(|(mime, url)| {
            mime.is_some_and(|t| t.trim().to_ascii_lowercase().starts_with("image"))
                && url.is_some_and(|u| !u.trim().is_empty())
        })
        .and_then(|(_, url)| url.map(|u| u.trim().to_string()))
}
