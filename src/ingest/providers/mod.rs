// src/ingest/providers/mod.rs
pub mod news;
pub mod youtube;

use std::borrow::Cow;

use anyhow::{anyhow, bail, Context, Result};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::name::{Namespace, QName, ResolveResult};
use quick_xml::reader::NsReader;

use crate::ingest::media::MediaAttrs;

const NS_ATOM: &[u8] = b"http://www.w3.org/2005/Atom";
const NS_RSS1: &[u8] = b"http://purl.org/rss/1.0/";

/// Extension namespaces keyed by their conventional prefix, whatever prefix
/// the document actually binds them to.
const KNOWN_NAMESPACES: &[(&[u8], &str)] = &[
    (b"http://search.yahoo.com/mrss/", "media"),
    (b"http://www.youtube.com/xml/schemas/2015", "yt"),
    (b"http://purl.org/rss/1.0/modules/content/", "content"),
    (b"http://purl.org/dc/elements/1.1/", "dc"),
    (b"http://www.w3.org/1999/02/22-rdf-syntax-ns#", "rdf"),
    (NS_ATOM, "atom"),
];

/// Owned element of a parsed feed document.
///
/// `name` is a normalized key: the document's own vocabulary (RSS, RSS 1.0,
/// Atom inside an Atom feed) is unprefixed, known extensions get their usual
/// prefix (`media:content`, `yt:videoId`, `atom:link` inside RSS), anything
/// else keeps the name as written.
#[derive(Debug, Default, Clone)]
pub(crate) struct XmlNode {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    /// Text of this element and all of its descendants, in document order.
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    /// Trimmed attribute value; `None` when missing or blank.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the first `name` child; `None` when missing or blank.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.trim())
            .filter(|s| !s.is_empty())
    }
}

/// Parse a feed body into its root element.
pub(crate) fn parse_tree(xml: &str) -> Result<XmlNode> {
    let mut reader = NsReader::from_str(xml);
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut atom_doc: Option<bool> = None;

    loop {
        let (ns, event) = reader.read_resolved_event().context("reading feed xml")?;
        match event {
            Event::Start(e) => stack.push(open_node(&ns, &e, &mut atom_doc)),
            Event::Empty(e) => {
                let node = open_node(&ns, &e, &mut atom_doc);
                if let Some(root) = close_into(&mut stack, node) {
                    return Ok(root);
                }
            }
            Event::End(_) => {
                let node = stack.pop().ok_or_else(|| anyhow!("unbalanced closing tag"))?;
                if let Some(root) = close_into(&mut stack, node) {
                    return Ok(root);
                }
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text_of(&t));
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::Eof if stack.is_empty() => bail!("feed body has no root element"),
            Event::Eof => {
                let open = stack.last().map(|n| n.name.as_str()).unwrap_or_default();
                bail!("unexpected end of feed xml inside <{open}>")
            }
            _ => {}
        }
    }
}

fn open_node(ns: &ResolveResult, e: &BytesStart, atom_doc: &mut Option<bool>) -> XmlNode {
    let is_atom = *atom_doc.get_or_insert_with(|| {
        matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == NS_ATOM)
            || e.local_name().as_ref() == b"feed"
    });
    let attrs = e
        .attributes()
        .flatten()
        .map(|a| {
            let key = String::from_utf8_lossy(a.key.as_ref()).into_owned();
            let value = a
                .unescape_value()
                .map(Cow::into_owned)
                .unwrap_or_else(|_| lenient_decode(&a.value));
            (key, value)
        })
        .collect();
    XmlNode {
        name: element_key(ns, e.name(), is_atom),
        attrs,
        ..XmlNode::default()
    }
}

fn element_key(ns: &ResolveResult, qname: QName, atom_doc: bool) -> String {
    let written = || String::from_utf8_lossy(qname.as_ref()).into_owned();
    let ResolveResult::Bound(Namespace(uri)) = ns else {
        return written();
    };
    let local = String::from_utf8_lossy(qname.local_name().as_ref()).into_owned();
    if *uri == NS_RSS1 || (atom_doc && *uri == NS_ATOM) {
        return local;
    }
    match KNOWN_NAMESPACES.iter().find(|(known, _)| known == uri) {
        Some((_, prefix)) => format!("{prefix}:{local}"),
        None => written(),
    }
}

/// Attach a finished element to its parent. Returns it when it is the root.
fn close_into(stack: &mut [XmlNode], node: XmlNode) -> Option<XmlNode> {
    let Some(parent) = stack.last_mut() else {
        return Some(node);
    };
    if !node.text.trim().is_empty() {
        if !parent.text.is_empty() && !parent.text.ends_with(char::is_whitespace) {
            parent.text.push(' ');
        }
        parent.text.push_str(&node.text);
    }
    parent.children.push(node);
    None
}

// HTML entities that survived the pre-parse scrub make strict unescaping
// fail; decode them leniently instead of dropping the text.
fn text_of(t: &BytesText) -> String {
    t.unescape()
        .map(Cow::into_owned)
        .unwrap_or_else(|_| lenient_decode(t))
}

fn lenient_decode(raw: &[u8]) -> String {
    html_escape::decode_html_entities(&String::from_utf8_lossy(raw)).into_owned()
}

/// Atom `<link rel=".." type=".." href=".."/>`.
#[derive(Debug, Clone, Default)]
pub(crate) struct AtomLink {
    pub href: Option<String>,
    pub rel: Option<String>,
    pub mime: Option<String>,
}

impl From<&XmlNode> for AtomLink {
    fn from(n: &XmlNode) -> Self {
        Self {
            href: n.attr("href").map(String::from),
            rel: n.attr("rel").map(String::from),
            mime: n.attr("type").map(String::from),
        }
    }
}

impl AtomLink {
    fn rel_is(&self, want: &str) -> bool {
        // A missing rel means "alternate" per RFC 4287.
        self.rel.as_deref().unwrap_or("alternate").eq_ignore_ascii_case(want)
    }
}

impl From<&XmlNode> for MediaAttrs {
    fn from(n: &XmlNode) -> Self {
        Self {
            url: n.attr("url").map(String::from),
            medium: n.attr("medium").map(String::from),
            mime: n.attr("type").map(String::from),
        }
    }
}

/// `rel="alternate"` href, else the first href at all.
pub(crate) fn alternate_href(links: &[AtomLink]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel_is("alternate") && l.href.is_some())
        .or_else(|| links.iter().find(|l| l.href.is_some()))
        .and_then(|l| l.href.clone())
}

pub(crate) fn enclosure_links(links: &[AtomLink]) -> impl Iterator<Item = &AtomLink> {
    links.iter().filter(|l| l.rel_is("enclosure"))
}
