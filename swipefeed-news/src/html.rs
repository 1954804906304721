//! Small HTML helpers: tag stripping, `<img>` scanning and page meta images
//!
//! These work on fragments and whole pages with plain regexes. None of them
//! needs a DOM; feeds embed far too much broken markup for strict parsing.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Attributes checked on `<img>` tags, in priority order
const IMG_ATTRIBUTES: [&str; 4] = ["src", "data-src", "data-original", "srcset"];

const OG_IMAGE_KEYS: [&str; 3] = ["og:image", "og:image:url", "og:image:secure_url"];
const TWITTER_IMAGE_KEYS: [&str; 2] = ["twitter:image", "twitter:image:src"];

// Compiled once; `None` only if a pattern fails to compile, which callers
// treat as "nothing found"
static SCRIPT_STYLE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<(script|style)\b.*?</(script|style)\s*>").ok());
static NUMERIC_ENTITY_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").ok());
static ATTRIBUTE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z_:][-a-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).ok()
});
static IMG_TAG_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?is)<img\b[^>]*>").ok());
static META_TAG_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").ok());

/// Remove tags, decode common entities and collapse whitespace
pub fn strip_html(html: &str) -> String {
    let without_blocks = match SCRIPT_STYLE_RE.as_ref() {
        Some(re) => re.replace_all(html, " ").into_owned(),
        None => html.to_string(),
    };

    let mut result = String::with_capacity(without_blocks.len());
    let mut in_tag = false;
    for c in without_blocks.chars() {
        match c {
            '<' => {
                in_tag = true;
                result.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }

    decode_entities(&result)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode the handful of entities that show up in feed text
pub fn decode_entities(text: &str) -> String {
    let named = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&rsquo;", "'")
        .replace("&lsquo;", "'")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&mdash;", "-")
        .replace("&ndash;", "-")
        .replace("&hellip;", "...");

    let numeric = match NUMERIC_ENTITY_RE.as_ref() {
        Some(re) => re
            .replace_all(&named, |caps: &regex::Captures| {
                let code = &caps[1];
                let value = match code.strip_prefix('x') {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => code.parse::<u32>().ok(),
                };
                value
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_default()
            })
            .into_owned(),
        None => named,
    };

    // Last, so "&amp;lt;" stays literal text
    numeric.replace("&amp;", "&")
}

/// Attributes of a single start tag, names lower-cased, values entity-decoded
fn tag_attributes(tag: &str) -> Vec<(String, String)> {
    let Some(re) = ATTRIBUTE_RE.as_ref() else {
        return Vec::new();
    };

    re.captures_iter(tag)
        .map(|caps| {
            let name = caps[1].to_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            (name, decode_entities(value.trim()))
        })
        .collect()
}

fn attribute<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
        .filter(|value| !value.is_empty())
}

/// 1x1 trackers and spacers embedded in feed bodies
fn is_tracking_pixel(attrs: &[(String, String)], candidate: &str) -> bool {
    let tiny = |name: &str| attribute(attrs, name).is_some_and(|v| v == "1" || v == "0");
    if tiny("width") && tiny("height") {
        return true;
    }

    let lower = candidate.to_lowercase();
    ["pixel", "tracking", "spacer.gif", "blank.gif", "feeds.feedburner.com/~r/", "/beacon"]
        .iter()
        .any(|marker| lower.contains(marker))
}

/// First usable image URL among the `<img>` tags of an HTML fragment
///
/// Per tag, `src` wins over the lazy-loading attributes; for `srcset` the
/// first candidate is taken. Inline `data:` URIs and tracking pixels are skipped.
pub fn first_image_in_html(html: &str) -> Option<String> {
    let img = IMG_TAG_RE.as_ref()?;

    for tag in img.find_iter(html) {
        let attrs = tag_attributes(tag.as_str());
        for name in IMG_ATTRIBUTES {
            let Some(value) = attribute(&attrs, name) else {
                continue;
            };
            let candidate = if name == "srcset" {
                match first_srcset_candidate(value) {
                    Some(c) => c,
                    None => continue,
                }
            } else {
                value
            };
            if candidate.starts_with("data:") || is_tracking_pixel(&attrs, candidate) {
                continue;
            }
            return Some(candidate.to_string());
        }
    }

    None
}

fn first_srcset_candidate(srcset: &str) -> Option<&str> {
    srcset
        .split(',')
        .next()
        .and_then(|entry| entry.split_whitespace().next())
        .filter(|url| !url.is_empty())
}

/// `og:image` (preferred) or `twitter:image` from a page's `<meta>` tags
pub fn extract_meta_image(html: &str) -> Option<String> {
    let meta = META_TAG_RE.as_ref()?;
    let tags: Vec<Vec<(String, String)>> = meta
        .find_iter(html)
        .map(|m| tag_attributes(m.as_str()))
        .collect();

    let lookup = |keys: &[&str]| {
        tags.iter().find_map(|attrs| {
            let key = attribute(attrs, "property")
                .or_else(|| attribute(attrs, "name"))?
                .to_lowercase();
            if keys.contains(&key.as_str()) {
                attribute(attrs, "content").map(str::to_string)
            } else {
                None
            }
        })
    };

    lookup(&OG_IMAGE_KEYS).or_else(|| lookup(&TWITTER_IMAGE_KEYS))
}

/// Resolve `candidate` to an absolute http(s) URL
///
/// Relative and protocol-relative references are joined onto `base`;
/// anything that cannot be made absolute, or uses another scheme, is dropped.
pub fn resolve_url(candidate: &str, base: Option<&str>) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }

    let resolved = match Url::parse(candidate) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(base?.trim()).ok()?;
            base.join(candidate).ok()?
        }
        Err(_) => return None,
    };

    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

/// Host of a URL without a leading `www.`
pub fn host_label(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}
