//! Core entry types for feedticker.
//!
//! A [`FeedEntry`] is the slice of a feed item that the ticker caches and
//! displays: its title, publication date, body and a plain-text snippet.

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Names of the fields every cached entry carries, in storage order.
pub const FIELD_NAMES: &[&str] = &["title", "pub_date", "content", "content_snippet"];

/// A single feed entry as cached and displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    /// Identifier assigned by the cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Entry headline.
    pub title: String,

    /// Publication date exactly as the feed states it.
    pub pub_date: Option<String>,

    /// Entry body, possibly containing markup.
    pub content: String,

    /// Plain-text rendering of `content`.
    pub content_snippet: String,
}

impl FeedEntry {
    /// Create an entry from its parts, deriving the snippet from `content`.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        pub_date: Option<String>,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        let content_snippet = snippet(&content);
        Self {
            id: None,
            title: title.into(),
            pub_date,
            content,
            content_snippet,
        }
    }

    /// Project a parsed feed item onto the cached fields.
    ///
    /// The body is taken from `<description>`, falling back to
    /// `<content:encoded>` when the item has no description.
    #[must_use]
    pub fn from_item(item: &rss::Item) -> Self {
        let content = item
            .description()
            .or_else(|| item.content())
            .unwrap_or_default();

        Self::new(
            item.title().unwrap_or_default().trim(),
            item.pub_date().map(str::to_string),
            content.trim(),
        )
    }

    /// Parse the publication date, if present and well formed.
    ///
    /// RSS mandates RFC 2822 dates; RFC 3339 is accepted as well since
    /// plenty of feeds emit it anyway.
    #[must_use]
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.pub_date.as_deref()?.trim();
        DateTime::parse_from_rfc2822(raw)
            .or_else(|_| DateTime::parse_from_rfc3339(raw))
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Compare the cached fields, ignoring the store-assigned id.
    #[must_use]
    pub fn same_content(&self, other: &FeedEntry) -> bool {
        self.title == other.title
            && self.pub_date == other.pub_date
            && self.content == other.content
            && self.content_snippet == other.content_snippet
    }

    /// Check that the entry carries every required field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] if the title is blank.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::missing_field("title"));
        }
        Ok(())
    }
}

/// Elements whose boundaries separate words in the snippet.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption", "figure",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre",
    "section", "table", "td", "th", "tr", "ul",
];

/// Elements whose text is never shown.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "template", "noscript"];

/// Derive a plain-text snippet from an entry body.
///
/// The body is parsed as an HTML fragment, so every character reference is
/// decoded and attribute values never leak into the text. Block elements
/// separate words, and runs of whitespace collapse to a single space.
#[must_use]
pub fn snippet(content: &str) -> String {
    let fragment = Html::parse_fragment(content);
    let mut text = String::with_capacity(content.len());
    collect_text(fragment.root_element(), &mut text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            let name = child.value().name();
            if HIDDEN_ELEMENTS.contains(&name) {
                out.push(' ');
                continue;
            }
            let block = BLOCK_ELEMENTS.contains(&name);
            if block {
                out.push(' ');
            }
            collect_text(child, out);
            if block {
                out.push(' ');
            }
        }
    }
}
