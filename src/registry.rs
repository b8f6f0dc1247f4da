//! The subscription registry: the one piece of shared mutable state.
//!
//! Feeds are keyed by their self-reported title — the first destination to
//! successfully watch a URL establishes the key. Two distinct URLs whose
//! feeds report the same title therefore collide into one subscription; this
//! is a known sharp edge kept on purpose rather than silently re-keying by
//! URL.
//!
//! The registry lock is coarse and is only ever held for in-memory mutation.
//! Fetches and delivery happen outside it: the poll cycle takes a snapshot
//! via [`Registry::poll_targets`], fetches with the lock released, and comes
//! back through [`Registry::commit`] to advance the high-water mark.

use crate::auth::Credentials;
use crate::transport::Destination;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// One watched feed: where to fetch it, who wants it, and the timestamp of
/// the newest entry already seen.
#[derive(Debug, Clone)]
pub struct FeedSubscription {
    pub url: String,
    /// Resolved once at watch time; later config changes do not retroactively
    /// apply to existing subscriptions.
    pub credentials: Option<Credentials>,
    /// High-water mark: only entries strictly newer than this are delivered.
    /// Monotonically non-decreasing.
    pub last_check: DateTime<Utc>,
    /// Subscriber identity → destination. Never empty for a live subscription.
    pub destinations: HashMap<String, Destination>,
}

/// Outcome of [`Registry::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// A new subscription was created, seeded with the caller's `last_check`.
    Created,
    /// The title was already watched; the destination was added (or
    /// refreshed) without touching `last_check`.
    Joined,
}

/// Outcome of [`Registry::leave`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Other destinations still watch the feed.
    Remaining { url: String },
    /// The caller was the last watcher; the subscription was removed.
    Removed { url: String },
}

/// Snapshot of one subscription for a poll cycle, taken under the lock and
/// iterated with the lock released.
#[derive(Debug, Clone)]
pub struct PollTarget {
    pub title: String,
    pub url: String,
    pub credentials: Option<Credentials>,
    pub last_check: DateTime<Utc>,
}

/// A `(title, url, last_check)` row for the `list` command.
#[derive(Debug, Clone)]
pub struct SubscriptionSummary {
    pub title: String,
    pub url: String,
    pub last_check: DateTime<Utc>,
}

/// Title-keyed map of live subscriptions behind a coarse mutex.
#[derive(Default)]
pub struct Registry {
    feeds: Mutex<HashMap<String, FeedSubscription>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.feeds.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.lock().unwrap().is_empty()
    }

    /// Look up a subscription by title (primarily for tests and diagnostics).
    pub fn get(&self, title: &str) -> Option<FeedSubscription> {
        self.feeds.lock().unwrap().get(title).cloned()
    }

    /// Create a subscription or join an existing one.
    ///
    /// Joining never touches `last_check` — the seed applies only when this
    /// call creates the subscription. A destination joining a title it
    /// already watches just refreshes its own entry.
    pub fn join(
        &self,
        title: &str,
        url: &str,
        credentials: Option<Credentials>,
        seed: DateTime<Utc>,
        destination: Destination,
    ) -> WatchOutcome {
        let mut feeds = self.feeds.lock().unwrap();
        match feeds.get_mut(title) {
            Some(subscription) => {
                subscription
                    .destinations
                    .insert(destination.id.clone(), destination);
                WatchOutcome::Joined
            }
            None => {
                let mut destinations = HashMap::new();
                destinations.insert(destination.id.clone(), destination);
                feeds.insert(
                    title.to_string(),
                    FeedSubscription {
                        url: url.to_string(),
                        credentials,
                        last_check: seed,
                        destinations,
                    },
                );
                tracing::info!(feed = %title, url = %url, "Watching new feed");
                WatchOutcome::Created
            }
        }
    }

    /// Remove `subscriber` from the named subscription.
    ///
    /// Returns `None` when the title is unknown or the caller is not among
    /// its destinations. When the last destination leaves, the subscription
    /// is removed entirely.
    pub fn leave(&self, title: &str, subscriber: &str) -> Option<LeaveOutcome> {
        let mut feeds = self.feeds.lock().unwrap();
        let subscription = feeds.get_mut(title)?;
        subscription.destinations.remove(subscriber)?;

        if subscription.destinations.is_empty() {
            let url = subscription.url.clone();
            feeds.remove(title);
            tracing::info!(feed = %title, "Last watcher left, removing feed");
            Some(LeaveOutcome::Removed { url })
        } else {
            Some(LeaveOutcome::Remaining {
                url: subscription.url.clone(),
            })
        }
    }

    /// Subscriptions the given subscriber is watching, for `list`.
    pub fn for_destination(&self, subscriber: &str) -> Vec<SubscriptionSummary> {
        let feeds = self.feeds.lock().unwrap();
        let mut summaries: Vec<SubscriptionSummary> = feeds
            .iter()
            .filter(|(_, sub)| sub.destinations.contains_key(subscriber))
            .map(|(title, sub)| SubscriptionSummary {
                title: title.clone(),
                url: sub.url.clone(),
                last_check: sub.last_check,
            })
            .collect();
        summaries.sort_by(|a, b| a.title.cmp(&b.title));
        summaries
    }

    /// Snapshot every subscription for one poll cycle.
    pub fn poll_targets(&self) -> Vec<PollTarget> {
        let feeds = self.feeds.lock().unwrap();
        feeds
            .iter()
            .map(|(title, sub)| PollTarget {
                title: title.clone(),
                url: sub.url.clone(),
                credentials: sub.credentials.clone(),
                last_check: sub.last_check,
            })
            .collect()
    }

    /// Advance a subscription's `last_check` to `newest` and return its
    /// current destination set.
    ///
    /// The high-water mark only moves forward; a stale commit (from a cycle
    /// that raced a user re-watch) cannot rewind it. Returns `None` when the
    /// subscription was removed between snapshot and commit — the cycle then
    /// drops that feed's pending entries.
    pub fn commit(&self, title: &str, newest: DateTime<Utc>) -> Option<Vec<Destination>> {
        let mut feeds = self.feeds.lock().unwrap();
        let subscription = feeds.get_mut(title)?;
        if newest > subscription.last_check {
            subscription.last_check = newest;
        }
        Some(subscription.destinations.values().cloned().collect())
    }
}
