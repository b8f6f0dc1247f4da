//! The background poller: one cycle sweep plus the adaptive scheduler that
//! drives it.

mod cycle;
mod scheduler;

pub use cycle::{format_entry, run_cycle, FeedEntry};
pub use scheduler::{spawn, IntervalChange, SchedulerHandle};
