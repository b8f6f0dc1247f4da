use crate::feed::FeedFetcher;
use crate::registry::Registry;
use crate::transport::{ChatTransport, Destination};
use crate::util::humanize;
use chrono::{DateTime, Utc};

/// A delivery-eligible entry: title, link, and a successfully parsed
/// publication time. Exists only for the duration of one poll cycle.
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub published: DateTime<Utc>,
}

/// The delivered message line for one entry.
pub fn format_entry(entry: &FeedEntry) -> String {
    format!(
        "[{}]({}) --- {}",
        entry.title,
        entry.link,
        humanize(entry.published)
    )
}

/// Run one full poll cycle: sweep every subscription, collect entries newer
/// than each feed's high-water mark, then deliver the whole batch in
/// ascending timestamp order across all feeds.
///
/// Per-feed failures (fetch errors, empty feeds, nothing new) only skip that
/// feed; the cycle always completes for the rest and never propagates an
/// error to the scheduler. The registry lock is held only inside
/// `poll_targets` and `commit` — every fetch and every delivery happens with
/// the lock released.
pub async fn run_cycle(registry: &Registry, fetcher: &FeedFetcher, transport: &dyn ChatTransport) {
    let targets = registry.poll_targets();
    if targets.is_empty() {
        return;
    }
    tracing::info!(feeds = targets.len(), "Checking feeds");

    let mut pending: Vec<(FeedEntry, Vec<Destination>)> = Vec::new();

    for target in targets {
        let feed = match fetcher.fetch(&target.url, target.credentials.as_ref()).await {
            Ok(feed) => feed,
            Err(e) => {
                tracing::error!(feed = %target.title, error = %e, "No feed found, skipping this cycle");
                continue;
            }
        };

        if feed.entries.is_empty() {
            tracing::info!(feed = %target.title, "Feed has no entries");
            continue;
        }

        let total = feed.entries.len();
        let dated: Vec<FeedEntry> = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                entry.published.map(|published| FeedEntry {
                    title: entry.title,
                    link: entry.link,
                    published,
                })
            })
            .collect();

        let undated = total - dated.len();
        if undated > 0 {
            tracing::debug!(feed = %target.title, skipped = undated, "Entries without parseable timestamps excluded");
        }

        // Newest/oldest by parsed timestamp, not feed order; feeds are not
        // guaranteed sorted.
        let Some(newest) = dated.iter().map(|e| e.published).max() else {
            tracing::warn!(feed = %target.title, entries = total, "No entries with parseable timestamps");
            continue;
        };
        let oldest = dated.iter().map(|e| e.published).min().unwrap_or(newest);

        let recent: Vec<FeedEntry> = dated
            .into_iter()
            .filter(|e| e.published > target.last_check)
            .collect();

        if recent.is_empty() {
            tracing::info!(
                feed = %target.title,
                entries = total,
                oldest = %humanize(oldest),
                newest = %humanize(newest),
                "No entries since last check"
            );
            continue;
        }

        match registry.commit(&target.title, newest) {
            Some(destinations) => {
                tracing::info!(
                    feed = %target.title,
                    found = recent.len(),
                    since = %humanize(target.last_check),
                    "Found new entries, updating last check time"
                );
                for entry in recent {
                    pending.push((entry, destinations.clone()));
                }
            }
            None => {
                tracing::debug!(feed = %target.title, "Subscription removed mid-cycle, dropping its entries");
            }
        }
    }

    // Global chronological order across all feeds; stable sort keeps
    // same-timestamp entries in sweep order.
    pending.sort_by_key(|(entry, _)| entry.published);

    for (entry, destinations) in pending {
        let text = format_entry(&entry);
        for destination in &destinations {
            transport.send(destination, &text).await;
        }
    }
}
