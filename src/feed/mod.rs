//! Feed retrieval, parsing and ordering.
//!
//! - [`fetcher`] - single-attempt HTTP retrieval returning a [`FetchOutcome`]
//! - [`parser`] - RSS/Atom normalization on top of `feed-rs`
//! - [`aggregator`] - concurrent fetch+parse over a URL list, in input order
//! - [`sort`] - stable entry ordering for display
//! - [`opml`] - reading feed lists from OPML subscription files
//!
//! # Example
//!
//! ```ignore
//! use rss_digest::feed::{Aggregator, FeedSettings, SortKey, SortOrder};
//!
//! let aggregator = Aggregator::new(FeedSettings::default())?;
//! let feeds = aggregator.aggregate(&urls, None).await;
//! for feed in &feeds {
//!     let items = feed.sorted(SortKey::Published, SortOrder::Descending);
//! }
//! ```

mod aggregator;
mod fetcher;
mod opml;
mod parser;
mod sort;
mod types;

pub use aggregator::Aggregator;
pub use fetcher::{FetchError, FetchOutcome, Fetcher};
pub use opml::{load as load_opml, parse_opml_content, OpmlError, OpmlFeed};
pub use parser::{EntryError, FeedParser, ParseError};
pub use sort::{sort_entries, SortKey, SortOrder, UnknownSortKey};
pub use types::{
    AggregateResult, ContentBlock, FeedItem, FeedSettings, Link, ParsedFeed,
    DEFAULT_REQUEST_TIMEOUT, NOT_FOUND_DESCRIPTION, NOT_FOUND_TITLE, UNKNOWN,
};

/// Feeds used when nothing else is configured.
pub const DEFAULT_FEEDS: &[&str] = &[
    "https://hnrss.org/newest",
    "http://xkcd.com/atom.xml",
    "http://feeds.mashable.com/Mashable",
];
