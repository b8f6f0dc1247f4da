use chrono::{DateTime, Utc};
use feed_rs::parser;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid feed document: {0}")]
    Document(String),
    /// A feed without a self-reported title cannot be keyed in the registry.
    #[error("feed has no title")]
    MissingTitle,
}

/// A structured feed: title plus the entries as emitted by the document.
///
/// Entry order is whatever the feed emitted — conventionally newest-first,
/// but nothing downstream may rely on it.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub title: String,
    pub entries: Vec<ParsedEntry>,
}

/// One feed item. `published` is `None` when the document carried no
/// timestamp or one the parser could not make sense of; such entries are
/// excluded from recency decisions and from delivery.
#[derive(Debug, Clone)]
pub struct ParsedEntry {
    pub title: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
}

/// Parse raw feed bytes into a [`ParsedFeed`].
///
/// A feed with zero entries is valid (title present, no items yet); a feed
/// without a title is not.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, ParseError> {
    let feed = parser::parse(bytes).map_err(|e| ParseError::Document(e.to_string()))?;

    let title = feed
        .title
        .map(|t| t.content)
        .filter(|t| !t.trim().is_empty())
        .ok_or(ParseError::MissingTitle)?;

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default();
            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "Untitled".to_string());
            let published = entry.published.or(entry.updated);

            ParsedEntry {
                title,
                link,
                published,
            }
        })
        .collect();

    Ok(ParsedFeed { title, entries })
}
