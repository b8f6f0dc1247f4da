//! The user-facing command surface: `watch`, `ignore`, `list`, `interval`.
//!
//! Each operation returns formatted, user-facing strings; errors a user can
//! cause (bad URL, unknown title, non-numeric interval) come back as
//! messages, never as `Err`. The chat-protocol front end that parses user
//! text lives outside this crate; [`CommandContext::dispatch`] is the thin
//! textual entry point it calls into.

use crate::auth::CredentialSet;
use crate::feed::FeedFetcher;
use crate::poller::{IntervalChange, SchedulerHandle};
use crate::registry::{LeaveOutcome, Registry};
use crate::transport::Destination;
use crate::util::humanize;
use chrono::Utc;
use std::sync::Arc;

/// Everything the four commands need: the registry they mutate, the fetcher
/// and credential set `watch` validates URLs with, and the scheduler handle
/// `interval` steers.
pub struct CommandContext {
    registry: Arc<Registry>,
    fetcher: FeedFetcher,
    credentials: CredentialSet,
    scheduler: SchedulerHandle,
}

impl CommandContext {
    pub fn new(
        registry: Arc<Registry>,
        fetcher: FeedFetcher,
        credentials: CredentialSet,
        scheduler: SchedulerHandle,
    ) -> Self {
        Self {
            registry,
            fetcher,
            credentials,
            scheduler,
        }
    }

    /// Watch a new feed (or join an existing subscription to it).
    ///
    /// Credentials are resolved once here and stored with the subscription.
    /// A newly created subscription is seeded with the newest existing
    /// entry's timestamp — or now, for a feed with no entries (or none with
    /// parseable timestamps) — so watching never replays history.
    pub async fn watch(&self, url: &str, destination: Destination) -> String {
        let credentials = self.credentials.resolve(url);
        let feed = match self.fetcher.fetch(url, credentials.as_ref()).await {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Watch failed");
                return format!("couldn't find a feed at {}", url);
            }
        };

        let seed = feed
            .entries
            .iter()
            .filter_map(|e| e.published)
            .max()
            .unwrap_or_else(Utc::now);

        // Created or joined, the confirmation reads the same; join() itself
        // logs the creation.
        self.registry
            .join(&feed.title, url, credentials, seed, destination);
        format!("watching [{}]({})", feed.title, url)
    }

    /// Stop watching a feed. The last destination out removes the
    /// subscription entirely.
    pub fn ignore(&self, title: &str, destination: &Destination) -> String {
        match self.registry.leave(title, &destination.id) {
            Some(LeaveOutcome::Remaining { url } | LeaveOutcome::Removed { url }) => {
                format!("ignoring [{}]({})", title, url)
            }
            None => format!("you aren't watching {}", title),
        }
    }

    /// List the caller's subscriptions with a humanized last-check time.
    pub fn list(&self, destination: &Destination) -> Vec<String> {
        let subscriptions = self.registry.for_destination(&destination.id);
        if subscriptions.is_empty() {
            return vec!["you aren't watching any feeds".to_string()];
        }
        subscriptions
            .into_iter()
            .map(|sub| {
                format!(
                    "[{}]({}) {}",
                    sub.title,
                    sub.url,
                    humanize(sub.last_check)
                )
            })
            .collect()
    }

    /// Report or change the polling interval.
    ///
    /// No argument reports the current interval; a non-numeric argument is a
    /// usage error and changes nothing; the current value again is a no-op
    /// reported as success.
    pub fn interval(&self, arg: Option<&str>) -> String {
        let arg = match arg {
            None => return describe_interval(self.scheduler.interval_secs()),
            Some(arg) => arg,
        };

        let secs: u64 = match arg.parse() {
            Ok(secs) => secs,
            Err(_) => return format!("'{}' is not a number of seconds", arg),
        };

        match self.scheduler.set_interval(secs) {
            IntervalChange::Unchanged(0) => "polling is already suspended".to_string(),
            IntervalChange::Unchanged(n) => format!("already polling every {} seconds", n),
            IntervalChange::Changed { old, new: 0 } => {
                format!("polling suspended (was every {} seconds)", old)
            }
            IntervalChange::Changed { old: 0, new } => {
                format!("polling every {} seconds (was suspended)", new)
            }
            IntervalChange::Changed { old, new } => {
                format!("polling every {} seconds (was {})", new, old)
            }
        }
    }

    /// Route one line of user text to the matching command.
    pub async fn dispatch(&self, line: &str, destination: &Destination) -> Vec<String> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "watch" if !rest.is_empty() => vec![self.watch(rest, destination.clone()).await],
            "watch" => vec!["usage: watch <url>".to_string()],
            // Feed titles may contain spaces; the rest of the line is the title.
            "ignore" if !rest.is_empty() => vec![self.ignore(rest, destination)],
            "ignore" => vec!["usage: ignore <title>".to_string()],
            "list" => self.list(destination),
            "interval" => {
                let arg = if rest.is_empty() { None } else { Some(rest) };
                vec![self.interval(arg)]
            }
            _ => vec!["commands: watch <url> | ignore <title> | list | interval [<seconds>]"
                .to_string()],
        }
    }
}

fn describe_interval(secs: u64) -> String {
    if secs == 0 {
        "polling is suspended".to_string()
    } else {
        format!("polling every {} seconds", secs)
    }
}
