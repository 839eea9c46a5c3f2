use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use thiserror::Error;

use crate::feed::types::FeedItem;

/// Field used to order entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Published,
    Title,
    Author,
    Id,
}

/// Direction of an entry sort. Most recent first unless asked otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub fn from_descending(descending: bool) -> Self {
        if descending {
            Self::Descending
        } else {
            Self::Ascending
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown sort key '{0}' (expected published, title, author or id)")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "published" => Ok(Self::Published),
            "title" => Ok(Self::Title),
            "author" => Ok(Self::Author),
            "id" => Ok(Self::Id),
            _ => Err(UnknownSortKey(s.to_string())),
        }
    }
}

fn compare_by(key: SortKey, a: &FeedItem, b: &FeedItem) -> Ordering {
    match key {
        SortKey::Published => a.published.cmp(&b.published),
        SortKey::Title => a.title.cmp(&b.title),
        SortKey::Author => a.author.cmp(&b.author),
        SortKey::Id => a.id.cmp(&b.id),
    }
}

/// Returns `items` sorted by `key` in the requested direction.
///
/// The sort is stable in both directions: entries with equal keys keep their
/// relative input order. The input slice is never modified.
pub fn sort_entries(items: &[FeedItem], key: SortKey, order: SortOrder) -> Vec<FeedItem> {
    let mut sorted = items.to_vec();
    match order {
        SortOrder::Ascending => sorted.sort_by(|a, b| compare_by(key, a, b)),
        SortOrder::Descending => sorted.sort_by(|a, b| compare_by(key, b, a)),
    }
    sorted
}
