use crate::auth::Credentials;
use crate::feed::parser::{parse_feed, ParseError, ParsedFeed};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MAX_TRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Errors that can occur while fetching a feed.
///
/// Every variant is recoverable at the cycle level: the caller skips the
/// feed for this cycle and leaves its subscription state untouched.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(String),
    /// Parsed result lacks a feed title
    #[error("Feed has no title")]
    MissingTitle,
}

impl From<ParseError> for FetchError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::Document(msg) => FetchError::Parse(msg),
            ParseError::MissingTitle => FetchError::MissingTitle,
        }
    }
}

/// Fetches feed documents over HTTP with a bounded linear retry policy.
///
/// Every failure mode — network error, non-2xx status, unparseable body,
/// missing feed title — consumes one attempt, with `retry_delay` between
/// attempts. The retry knobs are fields rather than constants so tests can
/// run with a single try or a zero delay.
#[derive(Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    max_tries: u32,
    retry_delay: Duration,
}

impl FeedFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_retry_policy(client, DEFAULT_MAX_TRIES, DEFAULT_RETRY_DELAY)
    }

    pub fn with_retry_policy(
        client: reqwest::Client,
        max_tries: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            client,
            max_tries: max_tries.max(1),
            retry_delay,
        }
    }

    /// Fetch and parse the feed at `url`, applying basic auth when
    /// credentials are present.
    ///
    /// Returns the last error once all tries are exhausted.
    pub async fn fetch(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<ParsedFeed, FetchError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_fetch(url, credentials).await {
                Ok(feed) => return Ok(feed),
                Err(e) if attempt < self.max_tries => {
                    tracing::warn!(
                        url = %url,
                        attempt = attempt,
                        max_tries = self.max_tries,
                        error = %e,
                        "Feed fetch failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    tracing::warn!(
                        url = %url,
                        tries = attempt,
                        error = %e,
                        "Feed fetch failed, giving up"
                    );
                    return Err(e);
                }
            }
        }
    }

    async fn try_fetch(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<ParsedFeed, FetchError> {
        let mut request = self.client.get(url);
        if let Some(creds) = credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = response.bytes().await?;
        Ok(parse_feed(&bytes)?)
    }
}
