use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
const USER_AGENT: &str = concat!("rss-digest/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur while retrieving a feed.
///
/// The `Display` output is the human-readable reason shown for a failed feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

impl FetchError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(err)
        }
    }
}

/// Result of fetching one feed URL.
///
/// Failures are values, not errors: callers decide what a failed feed turns
/// into (the aggregator substitutes a placeholder).
#[derive(Debug)]
pub enum FetchOutcome {
    /// The full response body, undecoded. The parser picks the character
    /// encoding from the document itself.
    Success(Vec<u8>),
    Failure(FetchError),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }

    pub fn into_result(self) -> Result<Vec<u8>, FetchError> {
        match self {
            FetchOutcome::Success(body) => Ok(body),
            FetchOutcome::Failure(e) => Err(e),
        }
    }
}

/// Single-attempt HTTP feed fetcher.
///
/// Cloning is cheap: the underlying `reqwest::Client` is reference counted and
/// keeps one connection pool for every clone.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl Fetcher {
    /// Builds a fetcher with its own HTTP client.
    ///
    /// `timeout` bounds every request end to end (connect, headers, body).
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(timeout)
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, timeout })
    }

    /// Wraps an existing client. The fetcher still enforces `timeout` itself,
    /// so a client built without one cannot hang a run.
    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetches `url` once.
    ///
    /// Non-2xx responses, transport errors, timeouts and oversized or truncated
    /// bodies all come back as [`FetchOutcome::Failure`]; a warning is logged
    /// for each failure. Nothing is logged on success.
    pub async fn fetch(&self, url: &Url) -> FetchOutcome {
        let result = match tokio::time::timeout(self.timeout, self.fetch_body(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        };

        match result {
            Ok(body) => FetchOutcome::Success(body),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Unable to retrieve feed");
                FetchOutcome::Failure(e)
            }
        }
    }

    async fn fetch_body(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        read_limited_bytes(response, MAX_FEED_SIZE).await
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::from_reqwest)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
