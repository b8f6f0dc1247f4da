//! Feed fetching and parsing.
//!
//! [`parser`] turns raw HTTP body bytes into a [`ParsedFeed`]; [`fetcher`]
//! wraps the HTTP round trip with bounded retries and optional basic auth.
//! Both report failure per feed — a bad feed never takes down a poll cycle.

mod fetcher;
mod parser;

pub use fetcher::{FeedFetcher, FetchError, DEFAULT_MAX_TRIES, DEFAULT_RETRY_DELAY};
pub use parser::{parse_feed, ParseError, ParsedEntry, ParsedFeed};
