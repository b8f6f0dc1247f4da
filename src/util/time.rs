//! Humanized relative-time rendering for delivered entries and `list` output.

use chrono::{DateTime, Utc};

/// Render a timestamp as a relative, human-readable phrase ("3 hours ago").
///
/// Future-dated timestamps (malformed feeds, clock skew) render as
/// "just now" rather than a negative age.
pub fn humanize(ts: DateTime<Utc>) -> String {
    let diff = Utc::now().signed_duration_since(ts).num_seconds();

    if diff < 60 {
        return "just now".to_string();
    }

    if diff < 3600 {
        let minutes = diff / 60;
        return if minutes == 1 {
            "a minute ago".to_string()
        } else {
            format!("{} minutes ago", minutes)
        };
    }

    if diff < 86400 {
        let hours = diff / 3600;
        return if hours == 1 {
            "an hour ago".to_string()
        } else {
            format!("{} hours ago", hours)
        };
    }

    let days = diff / 86400;
    if days == 1 {
        "a day ago".to_string()
    } else {
        format!("{} days ago", days)
    }
}
