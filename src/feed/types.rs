use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::time::Duration;

use crate::feed::sort::{sort_entries, SortKey, SortOrder};

/// Title of the placeholder feed substituted for a failed URL.
pub const NOT_FOUND_TITLE: &str = "Not Found";
/// Description of the placeholder feed substituted for a failed URL.
pub const NOT_FOUND_DESCRIPTION: &str = "Unknown or malformed URL.";
/// Fallback for missing feed descriptions and entry authors.
pub const UNKNOWN: &str = "Unknown";

/// Default per-request timeout for feed fetches.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Settings
// ============================================================================

/// Reader-wide settings shared by every feed in a run.
///
/// Built once (usually from [`crate::config::Config::feed_settings`]) and
/// handed to the [`Aggregator`](crate::feed::Aggregator); nothing in here
/// changes while a run is in flight.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// Timezone every timestamp is converted into.
    pub timezone: Tz,
    /// Carry full article content blocks in addition to summaries.
    pub full_articles: bool,
    /// Upper bound for a single fetch (connect, headers and body).
    pub request_timeout: Duration,
    /// Maximum number of feeds in flight. `None` runs one unit per URL.
    pub max_concurrency: Option<usize>,
    /// Overall deadline for a run. Feeds still pending when it elapses
    /// are reported as not found.
    pub deadline: Option<Duration>,
    /// Reject loopback and private-network hosts before fetching.
    pub block_private_hosts: bool,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            full_articles: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_concurrency: None,
            deadline: None,
            block_private_hosts: false,
        }
    }
}

// ============================================================================
// Normalized feed data
// ============================================================================

/// A link record attached to a feed or an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub href: String,
    pub rel: Option<String>,
    pub media_type: Option<String>,
    pub title: Option<String>,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            rel: None,
            media_type: None,
            title: None,
        }
    }
}

impl From<feed_rs::model::Link> for Link {
    fn from(link: feed_rs::model::Link) -> Self {
        Self {
            href: link.href.trim().to_string(),
            rel: link.rel,
            media_type: link.media_type,
            title: link.title,
        }
    }
}

/// One block of full article content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentBlock {
    pub value: String,
    /// MIME type reported by the feed, e.g. `text/html`.
    #[serde(rename = "type")]
    pub content_type: String,
}

/// A single normalized entry.
///
/// `published` is always set: entries without a usable timestamp never make
/// it out of the parser. `links` is never empty and its first element is the
/// entry's primary link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedItem {
    pub id: String,
    pub title: String,
    pub author: String,
    pub summary: String,
    pub content: Option<Vec<ContentBlock>>,
    pub links: Vec<Link>,
    pub published: DateTime<Tz>,
}

impl FeedItem {
    /// The entry's primary link.
    pub fn primary_link(&self) -> Option<&Link> {
        self.links.first()
    }

    /// Text to display for this entry: the first content block when full
    /// content was carried, otherwise the summary.
    pub fn body(&self) -> &str {
        self.content
            .as_deref()
            .and_then(|blocks| blocks.first())
            .map(|block| block.value.as_str())
            .unwrap_or(&self.summary)
    }
}

/// Normalized metadata and entries of one feed.
///
/// `items` is in the order the feed listed them; use [`ParsedFeed::sorted`]
/// or [`sort_entries`] before display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedFeed {
    /// The configured URL this feed was fetched from.
    pub url: String,
    pub title: String,
    pub description: String,
    pub last_updated: DateTime<Tz>,
    pub links: Vec<Link>,
    pub items: Vec<FeedItem>,
    /// Why this feed is a placeholder. `None` for successfully parsed feeds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ParsedFeed {
    /// Placeholder for a URL that could not be validated, fetched or parsed.
    pub fn not_found(url: impl Into<String>, timezone: &Tz, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: NOT_FOUND_TITLE.to_string(),
            description: NOT_FOUND_DESCRIPTION.to_string(),
            last_updated: Utc::now().with_timezone(timezone),
            links: Vec::new(),
            items: Vec::new(),
            error: Some(reason.into()),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.error.is_some()
    }

    /// Returns a sorted copy of this feed's entries.
    pub fn sorted(&self, key: SortKey, order: SortOrder) -> Vec<FeedItem> {
        sort_entries(&self.items, key, order)
    }
}

/// One [`ParsedFeed`] per configured URL, in configuration order.
pub type AggregateResult = Vec<ParsedFeed>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item_with(summary: &str, content: Option<Vec<ContentBlock>>) -> FeedItem {
        FeedItem {
            id: "1".into(),
            title: "Title".into(),
            author: UNKNOWN.into(),
            summary: summary.into(),
            content,
            links: vec![Link::new("https://example.com/1")],
            published: Tz::UTC.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_not_found_placeholder() {
        let feed = ParsedFeed::not_found("bogus", &Tz::Europe__Berlin, "Invalid URL");
        assert_eq!(feed.title, "Not Found");
        assert_eq!(feed.description, "Unknown or malformed URL.");
        assert_eq!(feed.url, "bogus");
        assert!(feed.items.is_empty());
        assert!(feed.is_not_found());
        assert_eq!(feed.last_updated.timezone(), Tz::Europe__Berlin);
    }

    #[test]
    fn test_body_prefers_content() {
        let item = item_with(
            "short",
            Some(vec![ContentBlock {
                value: "the whole article".into(),
                content_type: "text/html".into(),
            }]),
        );
        assert_eq!(item.body(), "the whole article");
    }

    #[test]
    fn test_body_falls_back_to_summary() {
        assert_eq!(item_with("short", None).body(), "short");
        assert_eq!(item_with("short", Some(Vec::new())).body(), "short");
    }

    #[test]
    fn test_content_block_serializes_type_field() {
        let block = ContentBlock {
            value: "x".into(),
            content_type: "text/plain".into(),
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "text/plain");
    }
}
