use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use feed_rs::model::Entry;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::feed::types::{ContentBlock, FeedItem, FeedSettings, Link, ParsedFeed, UNKNOWN};
use crate::util::strip_control_chars;

/// The document could not be read as RSS or Atom at all.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed feed document: {0}")]
    Malformed(String),
}

/// Why a single entry was left out of a parsed feed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("entry has neither an updated nor a published timestamp")]
    MissingTimestamp,
    #[error("entry has no title")]
    MissingTitle,
    #[error("entry has no links")]
    MissingLink,
}

/// Turns RSS 2.0 / Atom documents into [`ParsedFeed`] values.
///
/// Format detection and XML handling are done by `feed-rs`; this type applies
/// the field fallbacks and converts every timestamp into the target timezone.
#[derive(Debug, Clone)]
pub struct FeedParser {
    timezone: Tz,
    full_articles: bool,
}

impl FeedParser {
    pub fn new(timezone: Tz, full_articles: bool) -> Self {
        Self {
            timezone,
            full_articles,
        }
    }

    pub fn from_settings(settings: &FeedSettings) -> Self {
        Self::new(settings.timezone, settings.full_articles)
    }

    /// Parses a raw feed document.
    ///
    /// Entries that cannot be normalized (no timestamp, no title, no link) are
    /// skipped with a diagnostic; the rest of the feed still parses. When
    /// `newer_than` is set, entries published at or after it are left out.
    ///
    /// The returned feed's `url` is empty; the caller knows where the document
    /// came from.
    ///
    /// # Errors
    ///
    /// [`ParseError::Malformed`] when the bytes are not a readable feed document.
    pub fn parse(
        &self,
        raw: &[u8],
        newer_than: Option<DateTime<Utc>>,
    ) -> Result<ParsedFeed, ParseError> {
        let feed = feed_rs::parser::parse(raw)
            .map_err(|e| ParseError::Malformed(e.to_string()))?;

        let title = feed
            .title
            .map(|t| clean(&t.content))
            .unwrap_or_default();
        let description = feed
            .description
            .map(|d| clean(&d.content))
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());
        let last_updated = feed
            .updated
            .or(feed.published)
            .unwrap_or_else(Utc::now)
            .with_timezone(&self.timezone);
        let links = feed.links.into_iter().map(Link::from).collect();

        let mut items = Vec::with_capacity(feed.entries.len());
        let mut skipped = 0usize;
        let mut excluded = 0usize;

        for entry in feed.entries {
            let entry_id = entry.id.clone();
            let item = match self.normalize_entry(entry) {
                Ok(item) => item,
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(feed = %title, entry = %entry_id, error = %e, "Unable to parse feed entry");
                    continue;
                }
            };

            if let Some(cutoff) = newer_than {
                if item.published.with_timezone(&Utc) >= cutoff {
                    excluded += 1;
                    continue;
                }
            }

            tracing::debug!(id = %item.id, "Added entry");
            items.push(item);
        }

        if skipped > 0 || excluded > 0 {
            tracing::debug!(
                feed = %title,
                kept = items.len(),
                skipped = skipped,
                excluded = excluded,
                "Entries left out of feed"
            );
        }

        Ok(ParsedFeed {
            url: String::new(),
            title,
            description,
            last_updated,
            links,
            items,
            error: None,
        })
    }

    /// Resolves one entry's fields through their fallback chains.
    fn normalize_entry(&self, entry: Entry) -> Result<FeedItem, EntryError> {
        let published = entry
            .updated
            .or(entry.published)
            .ok_or(EntryError::MissingTimestamp)?
            .with_timezone(&self.timezone);

        let title = entry
            .title
            .map(|t| clean(&t.content))
            .filter(|t| !t.is_empty())
            .ok_or(EntryError::MissingTitle)?;

        let links: Vec<Link> = entry
            .links
            .into_iter()
            .map(Link::from)
            .filter(|l| !l.href.is_empty())
            .collect();
        let primary = links.first().ok_or(EntryError::MissingLink)?;

        let author = entry
            .authors
            .into_iter()
            .map(|p| clean(&p.name))
            .find(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());

        let content = entry.content.and_then(|c| {
            let content_type = c.content_type.to_string();
            c.body.map(|value| ContentBlock {
                value,
                content_type,
            })
        });

        let summary = entry
            .summary
            .map(|s| s.content)
            .or_else(|| content.as_ref().map(|c| c.value.clone()))
            .unwrap_or_default();

        let id = entry_id(&entry.id, &primary.href, &title, published.timestamp());

        Ok(FeedItem {
            id,
            title,
            author,
            summary,
            content: if self.full_articles {
                content.map(|c| vec![c])
            } else {
                None
            },
            links,
            published,
        })
    }
}

fn clean(s: &str) -> String {
    strip_control_chars(s.trim()).into_owned()
}

/// Uses the feed's own id when it has one, otherwise a hash of the entry's
/// link, title and timestamp.
fn entry_id(existing: &str, url: &str, title: &str, published: i64) -> String {
    let trimmed = existing.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    let hash = Sha256::digest(format!("{}|{}|{}", url, title, published).as_bytes());
    format!("{:x}", hash)
}
