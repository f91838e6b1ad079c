//! Rendering snapshots for the terminal.

use std::fmt::Write as _;

use crate::config::DisplayConfig;
use crate::entry::FeedEntry;
use crate::error::Result;
use crate::ticker::{Origin, Snapshot};

const INDENT: &str = "    ";

/// Render a snapshot as a numbered list.
#[must_use]
pub fn render_text(snapshot: &Snapshot, config: &DisplayConfig) -> String {
    let mut out = String::new();

    let when = snapshot.refreshed_at.format("%Y-%m-%d %H:%M:%S UTC");
    match (&snapshot.origin, &snapshot.error) {
        (Origin::Cached, Some(err)) => {
            let _ = writeln!(out, "Headlines (cached, refresh at {when} failed: {err})");
        }
        (origin, _) => {
            let _ = writeln!(out, "Headlines ({origin}, {when})");
        }
    }

    if snapshot.entries.is_empty() {
        out.push_str("  No entries available.\n");
        return out;
    }

    let body_width = config.width.saturating_sub(INDENT.len()).max(1);
    for (index, entry) in snapshot.entries.iter().enumerate() {
        let _ = writeln!(out, "{:>2}. {}", index + 1, entry.title);
        if let Some(date) = format_date(entry) {
            let _ = writeln!(out, "{INDENT}{date}");
        }
        if config.show_snippets && !entry.content_snippet.is_empty() {
            let _ = writeln!(out, "{INDENT}{}", truncate(&entry.content_snippet, body_width));
        }
    }

    out
}

/// Render a snapshot as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(snapshot: &Snapshot) -> Result<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

/// Publication date for display: normalized when parseable, verbatim otherwise.
fn format_date(entry: &FeedEntry) -> Option<String> {
    match entry.published_at() {
        Some(at) => Some(at.format("%a, %d %b %Y %H:%M UTC").to_string()),
        None => entry.pub_date.clone().filter(|d| !d.trim().is_empty()),
    }
}

/// Cut `text` to at most `width` characters, marking the cut with an ellipsis.
#[must_use]
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", kept.trim_end())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn snapshot(entries: Vec<FeedEntry>, origin: Origin, error: Option<&str>) -> Snapshot {
        Snapshot {
            entries,
            origin,
            refreshed_at: at(),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly", 7), "exactly");
        assert_eq!(truncate("a longer sentence", 9), "a longer…");
        assert_eq!(truncate("héllo wörld", 6), "héllo…");
    }

    #[test]
    fn test_render_text_numbers_entries_in_order() {
        let snap = snapshot(
            vec![
                FeedEntry::new(
                    "First",
                    Some("Mon, 01 Jan 2024 10:00:00 GMT".to_string()),
                    "<p>one</p>",
                ),
                FeedEntry::new("Second", None, "two"),
            ],
            Origin::Live,
            None,
        );

        let text = render_text(&snap, &DisplayConfig::default());
        let first = text.find(" 1. First").unwrap();
        let second = text.find(" 2. Second").unwrap();
        assert!(first < second);
        assert!(text.starts_with("Headlines (live, 2024-05-01 12:00:00 UTC)"));
        assert!(text.contains("Mon, 01 Jan 2024 10:00 UTC"));
        assert!(text.contains("    one\n"));
    }

    #[test]
    fn test_render_text_keeps_unparseable_dates() {
        let snap = snapshot(
            vec![FeedEntry::new("Dated", Some("last tuesday".to_string()), "")],
            Origin::Live,
            None,
        );
        assert!(render_text(&snap, &DisplayConfig::default()).contains("    last tuesday\n"));
    }

    #[test]
    fn test_render_text_cached_header_mentions_error() {
        let snap = snapshot(
            vec![FeedEntry::new("Old news", None, "")],
            Origin::Cached,
            Some("HTTP 503"),
        );

        let text = render_text(&snap, &DisplayConfig::default());
        assert!(text.starts_with("Headlines (cached"));
        assert!(text.contains("HTTP 503"));
    }

    #[test]
    fn test_render_text_empty() {
        let snap = snapshot(Vec::new(), Origin::Cached, None);
        let text = render_text(&snap, &DisplayConfig::default());
        assert!(text.contains("No entries available."));
    }

    #[test]
    fn test_render_text_without_snippets() {
        let snap = snapshot(vec![FeedEntry::new("Title", None, "hidden body")], Origin::Live, None);
        let config = DisplayConfig {
            show_snippets: false,
            ..DisplayConfig::default()
        };
        assert!(!render_text(&snap, &config).contains("hidden body"));
    }

    #[test]
    fn test_render_text_truncates_snippets_to_width() {
        let body = "word ".repeat(40);
        let snap = snapshot(vec![FeedEntry::new("Title", None, body)], Origin::Live, None);
        let config = DisplayConfig {
            width: 24,
            ..DisplayConfig::default()
        };

        let text = render_text(&snap, &config);
        let snippet_line = text.lines().find(|l| l.starts_with(INDENT)).unwrap();
        assert!(snippet_line.chars().count() <= 24);
        assert!(snippet_line.ends_with('…'));
    }

    #[test]
    fn test_render_json() {
        let snap = snapshot(
            vec![FeedEntry::new("Title", None, "body")],
            Origin::Cached,
            Some("offline"),
        );

        let json = render_json(&snap).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["origin"], "cached");
        assert_eq!(value["error"], "offline");
        assert_eq!(value["entries"][0]["title"], "Title");
        assert_eq!(value["entries"][0]["contentSnippet"], "body");
    }
}
