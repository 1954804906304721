//! RSS/Atom parsing into a dialect-neutral entry shape
//!
//! RSS 2.0 is tried first, then Atom. Media RSS (`media:content`,
//! `media:thumbnail`, `media:group`) is read from the extension maps of
//! either dialect.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::NewsError;
use crate::html::strip_html;

/// A `media:thumbnail` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaThumbnail {
    pub url: String,
    pub width: Option<u32>,
}

/// One feed entry before normalization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub guid: Option<String>,
    pub link: Option<String>,
    pub title: Option<String>,
    pub categories: Vec<String>,
    /// Plain-text rendition of the entry body
    pub snippet: Option<String>,
    pub summary: Option<String>,
    /// `content:encoded`
    pub content_encoded: Option<String>,
    /// RSS description or Atom content, as HTML
    pub content: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub enclosure_url: Option<String>,
    /// First `media:content` URL
    pub media_content: Option<String>,
    pub media_thumbnails: Vec<MediaThumbnail>,
}

/// A parsed feed document
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<RawEntry>,
}

/// Parse an RSS or Atom document
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, NewsError> {
    let rss_error = match rss::Channel::read_from(bytes) {
        Ok(channel) => return Ok(from_channel(&channel)),
        Err(e) => e,
    };

    match atom_syndication::Feed::read_from(bytes) {
        Ok(feed) => Ok(from_atom(&feed)),
        Err(atom_error) => Err(NewsError::Parse(format!(
            "not RSS ({}) or Atom ({})",
            rss_error, atom_error
        ))),
    }
}

fn from_channel(channel: &rss::Channel) -> ParsedFeed {
    ParsedFeed {
        title: non_blank(Some(channel.title())),
        entries: channel.items().iter().map(from_rss_item).collect(),
    }
}

fn from_rss_item(item: &rss::Item) -> RawEntry {
    let description = non_blank(item.description());
    let published = item
        .pub_date()
        .and_then(parse_date)
        .or_else(|| {
            item.dublin_core_ext()
                .and_then(|dc| dc.dates().first())
                .and_then(|d| parse_date(d))
        });

    let enclosure_url = item
        .enclosure()
        .filter(|e| e.mime_type().is_empty() || e.mime_type().starts_with("image/"))
        .and_then(|e| non_blank(Some(e.url())));

    let mut entry = RawEntry {
        guid: item.guid().and_then(|g| non_blank(Some(g.value()))),
        link: non_blank(item.link()),
        title: non_blank(item.title()),
        categories: item
            .categories()
            .iter()
            .map(|c| c.name().trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        snippet: description.as_deref().map(strip_html).filter(|s| !s.is_empty()),
        summary: None,
        content_encoded: non_blank(item.content()),
        content: description,
        published,
        enclosure_url,
        ..RawEntry::default()
    };
    collect_media(item.extensions().get("media"), &mut entry);
    entry
}

fn from_atom(feed: &atom_syndication::Feed) -> ParsedFeed {
    ParsedFeed {
        title: non_blank(Some(feed.title().as_str())),
        entries: feed.entries().iter().map(from_atom_entry).collect(),
    }
}

fn from_atom_entry(entry: &atom_syndication::Entry) -> RawEntry {
    let link = entry
        .links()
        .iter()
        .find(|l| l.rel() == "alternate")
        .or_else(|| entry.links().first())
        .and_then(|l| non_blank(Some(l.href())));

    let content = entry.content().and_then(|c| non_blank(c.value()));
    let summary = entry.summary().and_then(|s| non_blank(Some(s.as_str())));
    let snippet = content
        .as_deref()
        .or(summary.as_deref())
        .map(strip_html)
        .filter(|s| !s.is_empty());

    // A missing <updated> parses as the epoch
    let updated = Some(entry.updated().with_timezone(&Utc)).filter(|d| d.timestamp() != 0);
    let published = entry
        .published()
        .map(|d| d.with_timezone(&Utc))
        .or(updated);

    let mut raw = RawEntry {
        guid: non_blank(Some(entry.id())),
        link,
        title: non_blank(Some(entry.title().as_str())),
        categories: entry
            .categories()
            .iter()
            .map(|c| c.label().unwrap_or(c.term()).trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        snippet,
        summary,
        content_encoded: None,
        content,
        published,
        ..RawEntry::default()
    };
    collect_media(entry.extensions().get("media"), &mut raw);
    raw
}

/// Common view over the extension element types of both feed crates
trait MediaElement: Sized {
    fn attr(&self, name: &str) -> Option<&str>;
    fn child(&self, name: &str) -> &[Self];
}

impl MediaElement for rss::extension::Extension {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs().get(name).map(String::as_str)
    }

    fn child(&self, name: &str) -> &[Self] {
        self.children().get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl MediaElement for atom_syndication::extension::Extension {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs().get(name).map(String::as_str)
    }

    fn child(&self, name: &str) -> &[Self] {
        self.children().get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn collect_media<E: MediaElement>(media: Option<&BTreeMap<String, Vec<E>>>, entry: &mut RawEntry) {
    let Some(media) = media else {
        return;
    };

    let empty = Vec::new();
    let contents = media.get("content").unwrap_or(&empty);
    let thumbnails = media.get("thumbnail").unwrap_or(&empty);
    let groups = media.get("group").unwrap_or(&empty);

    let group_contents = groups.iter().flat_map(|g| g.child("content").iter());
    for content in contents.iter().chain(group_contents) {
        if entry.media_content.is_none() && is_image_content(content) {
            entry.media_content = content.attr("url").and_then(|u| non_blank(Some(u)));
        }
        // Thumbnails nested in media:content (YouTube style)
        push_thumbnails(content.child("thumbnail"), entry);
    }

    push_thumbnails(thumbnails, entry);
    for group in groups {
        push_thumbnails(group.child("thumbnail"), entry);
    }
}

fn is_image_content<E: MediaElement>(content: &E) -> bool {
    let medium = content.attr("medium").unwrap_or_default();
    let mime = content.attr("type").unwrap_or_default();
    match (medium.is_empty(), mime.is_empty()) {
        (true, true) => true,
        _ => medium == "image" || mime.starts_with("image/"),
    }
}

fn push_thumbnails<E: MediaElement>(thumbnails: &[E], entry: &mut RawEntry) {
    for thumb in thumbnails {
        if let Some(url) = thumb.attr("url").and_then(|u| non_blank(Some(u))) {
            entry.media_thumbnails.push(MediaThumbnail {
                url,
                width: thumb.attr("width").and_then(|w| w.trim().parse().ok()),
            });
        }
    }
}

/// Parse the date formats seen in feeds: RFC 2822, RFC 3339 and bare dates
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|d| d.and_utc())
        })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
