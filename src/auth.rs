//! Credential resolution for feed URLs.
//!
//! The configuration file carries an ordered list of pattern entries, each a
//! wildcard domain pattern (`*example.com`) or a domain-plus-path pattern
//! (`*example.com/blog`) with a username/password pair. [`CredentialSet::resolve`]
//! maps a feed URL to the credentials of the last matching entry, so later
//! entries in the file override earlier ones. URLs matching no entry are
//! fetched anonymously.

use serde::Deserialize;
use url::Url;

/// A username/password pair applied as HTTP basic auth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// One `[[credential]]` entry from the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialEntry {
    /// `*<domain-suffix>` or `*<domain-suffix>/<path-prefix>`.
    pub pattern: String,
    pub username: String,
    pub password: String,
}

/// An ordered set of credential patterns.
#[derive(Debug, Clone, Default)]
pub struct CredentialSet {
    entries: Vec<CredentialEntry>,
}

impl CredentialSet {
    pub fn new(entries: Vec<CredentialEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve the credentials to use for a feed URL.
    ///
    /// When several patterns match, the last matching entry in configuration
    /// order wins. Unparseable URLs resolve to `None`.
    pub fn resolve(&self, url: &str) -> Option<Credentials> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        let path = parsed.path();

        let mut matched = None;
        for entry in &self.entries {
            if pattern_matches(&entry.pattern, host, path) {
                matched = Some(entry);
            }
        }

        matched.map(|entry| Credentials {
            username: entry.username.clone(),
            password: entry.password.clone(),
        })
    }
}

/// A pattern matches when the host ends with its domain suffix and, if a path
/// prefix is present, the URL path (leading slash stripped) starts with it.
fn pattern_matches(pattern: &str, host: &str, path: &str) -> bool {
    let pattern = pattern.strip_prefix('*').unwrap_or(pattern);
    let (domain_suffix, path_prefix) = match pattern.split_once('/') {
        Some((domain, prefix)) => (domain, Some(prefix)),
        None => (pattern, None),
    };

    if !host.ends_with(domain_suffix) {
        return false;
    }

    match path_prefix {
        None => true,
        Some(prefix) => path.trim_start_matches('/').starts_with(prefix),
    }
}
