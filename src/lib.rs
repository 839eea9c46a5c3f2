//! Concurrent RSS/Atom digest builder.
//!
//! The pipeline is: validate each configured URL, fetch it once, parse the
//! document into a [`feed::ParsedFeed`], collect the results in input order,
//! sort each feed's entries and render a single page.
//!
//! ```ignore
//! use rss_digest::feed::{Aggregator, FeedSettings};
//!
//! let aggregator = Aggregator::new(FeedSettings::default())?;
//! let feeds = aggregator.aggregate(&urls, None).await;
//! let page = rss_digest::render::render_html(&feeds, &options);
//! ```

pub mod config;
pub mod feed;
pub mod output;
pub mod render;
pub mod util;
