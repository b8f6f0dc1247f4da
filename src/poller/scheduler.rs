//! Adaptive poll scheduling.
//!
//! A single spawned task owns the Idle/Scheduled/Running state machine:
//!
//! - **Idle**: interval is 0 (polling suspended); the task waits only on its
//!   control channel.
//! - **Scheduled**: a `sleep(interval)` is armed, raced against the control
//!   channel so an interval change replaces the pending timer immediately.
//! - **Running**: one poll cycle executes to completion; afterwards the
//!   elapsed wall-clock time is measured and, if the cycle outlasted the
//!   interval, the interval is lengthened to match. The interval is never
//!   shortened automatically — only an explicit user command does that.
//!
//! [`SchedulerHandle::stop`] flips the shared `enabled` flag before
//! signalling the task, so no new cycle can start once it returns; a cycle
//! already running finishes, and it is only its re-arm that the flag
//! suppresses.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};

#[derive(Debug)]
enum Command {
    /// Replace any pending timer; the wait restarts from zero with the
    /// current interval.
    Reschedule,
    Stop,
}

#[derive(Debug)]
struct Shared {
    interval_secs: u64,
    last_cycle: Option<Duration>,
    enabled: bool,
}

/// Result of [`SchedulerHandle::set_interval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalChange {
    Changed { old: u64, new: u64 },
    /// Setting the current value again is a no-op: no timer is replaced.
    Unchanged(u64),
}

/// Cloneable handle for inspecting and steering the scheduler task.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Arc<Mutex<Shared>>,
    tx: mpsc::UnboundedSender<Command>,
}

impl SchedulerHandle {
    /// The current polling interval in seconds (0 = suspended).
    pub fn interval_secs(&self) -> u64 {
        self.shared.lock().unwrap().interval_secs
    }

    /// Wall-clock duration of the most recent completed cycle.
    pub fn last_cycle(&self) -> Option<Duration> {
        self.shared.lock().unwrap().last_cycle
    }

    /// Change the polling interval, replacing any pending timer.
    ///
    /// Setting 0 suspends polling. Setting the current value changes
    /// nothing and does not reschedule.
    pub fn set_interval(&self, secs: u64) -> IntervalChange {
        let old = {
            let mut state = self.shared.lock().unwrap();
            if state.interval_secs == secs {
                return IntervalChange::Unchanged(secs);
            }
            let old = state.interval_secs;
            state.interval_secs = secs;
            old
        };
        let _ = self.tx.send(Command::Reschedule);
        tracing::info!(old = old, new = secs, "Polling interval changed");
        IntervalChange::Changed { old, new: secs }
    }

    /// Stop the scheduler. Safe to call from any state, idempotent, and
    /// guarantees no further cycle starts after this returns. A cycle
    /// already in flight runs to completion.
    pub fn stop(&self) {
        self.shared.lock().unwrap().enabled = false;
        let _ = self.tx.send(Command::Stop);
    }
}

/// Spawn the scheduler task driving `cycle` every `interval_secs` seconds.
pub fn spawn<F, Fut>(interval_secs: u64, cycle: F) -> SchedulerHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let shared = Arc::new(Mutex::new(Shared {
        interval_secs,
        last_cycle: None,
        enabled: true,
    }));
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = SchedulerHandle {
        shared: Arc::clone(&shared),
        tx,
    };
    tokio::spawn(run_loop(shared, rx, cycle));
    handle
}

async fn run_loop<F, Fut>(
    shared: Arc<Mutex<Shared>>,
    mut rx: mpsc::UnboundedReceiver<Command>,
    mut cycle: F,
) where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    loop {
        let (enabled, interval) = {
            let state = shared.lock().unwrap();
            (state.enabled, state.interval_secs)
        };
        if !enabled {
            break;
        }

        if interval == 0 {
            // Idle: polling suspended until an interval change arrives.
            match rx.recv().await {
                Some(Command::Reschedule) => continue,
                Some(Command::Stop) | None => break,
            }
        }

        tokio::select! {
            _ = sleep(Duration::from_secs(interval)) => {
                // stop() may have raced the timer; check before starting.
                if !shared.lock().unwrap().enabled {
                    break;
                }
                let started = Instant::now();
                cycle().await;
                adjust_interval(&shared, started.elapsed());
            }
            cmd = rx.recv() => match cmd {
                Some(Command::Reschedule) => continue,
                Some(Command::Stop) | None => break,
            }
        }
    }
    tracing::info!("Feed poller stopped");
}

/// Record the cycle duration and lengthen the interval when the cycle
/// outlasted it, so on-time timer starts cannot pile up behind a slow
/// sweep. Correction is after the fact: one slow cycle of lag before the
/// interval catches up.
fn adjust_interval(shared: &Mutex<Shared>, elapsed: Duration) {
    let mut state = shared.lock().unwrap();
    state.last_cycle = Some(elapsed);
    let interval = state.interval_secs;
    if interval > 0 && elapsed.as_secs() > interval {
        let new = elapsed.as_secs();
        tracing::warn!(
            old = interval,
            new = new,
            "Cycle outlasted the polling interval, lengthening it"
        );
        state.interval_secs = new;
    }
}
