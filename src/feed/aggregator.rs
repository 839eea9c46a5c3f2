use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use url::Url;

use crate::feed::fetcher::{FetchError, FetchOutcome, Fetcher};
use crate::feed::parser::FeedParser;
use crate::feed::types::{AggregateResult, FeedSettings, ParsedFeed};
use crate::util::{validate_public_url, validate_url, UrlValidationError};

const DEADLINE_REASON: &str = "Run deadline elapsed before the feed completed";
const MISSING_TITLE_REASON: &str = "Feed document has no title";

/// Fetches and parses a list of feeds concurrently.
///
/// Every configured URL yields exactly one [`ParsedFeed`], in configuration
/// order. A URL that fails validation, fetching or parsing yields the
/// "Not Found" placeholder; it never affects the other feeds.
#[derive(Debug, Clone)]
pub struct Aggregator {
    fetcher: Fetcher,
    parser: FeedParser,
    settings: FeedSettings,
}

impl Aggregator {
    /// Builds an aggregator with its own HTTP client.
    pub fn new(settings: FeedSettings) -> Result<Self, FetchError> {
        let fetcher = Fetcher::new(settings.request_timeout)?;
        Ok(Self::with_fetcher(settings, fetcher))
    }

    pub fn with_fetcher(settings: FeedSettings, fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            parser: FeedParser::from_settings(&settings),
            settings,
        }
    }

    pub fn settings(&self) -> &FeedSettings {
        &self.settings
    }

    fn validate(&self, url: &str) -> Result<Url, UrlValidationError> {
        if self.settings.block_private_hosts {
            validate_public_url(url)
        } else {
            validate_url(url)
        }
    }

    /// Fetches and parses every URL and returns one feed per URL, in input order.
    ///
    /// Invalid URLs are replaced by the placeholder without any request. Valid
    /// ones run concurrently, at most `max_concurrency` at a time (all at once
    /// when unset). When the settings carry a deadline, feeds still pending
    /// once it elapses are reported as not found.
    ///
    /// `newer_than` is forwarded to the parser: entries published at or after
    /// it are left out.
    pub async fn aggregate(
        &self,
        urls: &[String],
        newer_than: Option<DateTime<Utc>>,
    ) -> AggregateResult {
        let timezone = self.settings.timezone;
        let started = Instant::now();
        let mut slots: Vec<Option<ParsedFeed>> = (0..urls.len()).map(|_| None).collect();
        let mut pending = Vec::with_capacity(urls.len());

        for (index, raw) in urls.iter().enumerate() {
            match self.validate(raw) {
                Ok(url) => pending.push((index, url)),
                Err(e) => {
                    tracing::warn!(url = %raw, error = %e, "Skipping invalid feed URL");
                    slots[index] = Some(ParsedFeed::not_found(raw.as_str(), &timezone, e.to_string()));
                }
            }
        }

        if !pending.is_empty() {
            let limit = self
                .settings
                .max_concurrency
                .filter(|n| *n > 0)
                .unwrap_or(pending.len());
            let deadline = self.settings.deadline.map(|d| started + d);

            let mut units = stream::iter(pending)
                .map(|(index, url)| async move {
                    let feed = self.fetch_and_parse(&urls[index], &url, newer_than).await;
                    (index, feed)
                })
                .buffer_unordered(limit);

            loop {
                let next = match deadline {
                    Some(at) => match tokio::time::timeout_at(at, units.next()).await {
                        Ok(next) => next,
                        Err(_) => {
                            let unfinished = slots.iter().filter(|s| s.is_none()).count();
                            tracing::warn!(unfinished = unfinished, "Aggregation deadline elapsed");
                            break;
                        }
                    },
                    None => units.next().await,
                };

                match next {
                    Some((index, feed)) => slots[index] = Some(feed),
                    None => break,
                }
            }
        }

        let result: AggregateResult = slots
            .into_iter()
            .zip(urls)
            .map(|(slot, url)| {
                slot.unwrap_or_else(|| ParsedFeed::not_found(url.as_str(), &timezone, DEADLINE_REASON))
            })
            .collect();

        let failed = result.iter().filter(|f| f.is_not_found()).count();
        tracing::info!(
            feeds = result.len(),
            failed = failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Aggregation complete"
        );

        result
    }

    /// Runs [`Aggregator::aggregate`] to completion on a private runtime.
    ///
    /// For synchronous callers. Returns an error instead of blocking when
    /// called from within a Tokio runtime.
    pub fn aggregate_blocking(
        &self,
        urls: &[String],
        newer_than: Option<DateTime<Utc>>,
    ) -> std::io::Result<AggregateResult> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(std::io::Error::other(
                "aggregate_blocking called from within a Tokio runtime; use aggregate().await",
            ));
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(runtime.block_on(self.aggregate(urls, newer_than)))
    }

    async fn fetch_and_parse(
        &self,
        raw: &str,
        url: &Url,
        newer_than: Option<DateTime<Utc>>,
    ) -> ParsedFeed {
        let timezone = self.settings.timezone;
        tracing::debug!(url = %url, "Attempting to retrieve and parse feed");

        let body = match self.fetcher.fetch(url).await {
            FetchOutcome::Success(body) => body,
            FetchOutcome::Failure(e) => return ParsedFeed::not_found(raw, &timezone, e.to_string()),
        };

        match self.parser.parse(&body, newer_than) {
            Ok(mut feed) if !feed.title.is_empty() => {
                feed.url = raw.to_string();
                tracing::info!(
                    url = %url,
                    title = %feed.title,
                    items = feed.items.len(),
                    "Feed retrieval and parsing completed"
                );
                feed
            }
            Ok(_) => {
                tracing::warn!(url = %url, "Feed document has no title, treating as malformed");
                ParsedFeed::not_found(raw, &timezone, MISSING_TITLE_REASON)
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Unable to parse feed");
                ParsedFeed::not_found(raw, &timezone, e.to_string())
            }
        }
    }
}
