//! Shared scheduler control: cancellation, pause/resume, tick speed, and
//! the cycle counter.
//!
//! The scheduler task and whoever else holds the [`Arc`]'d
//! [`SchedulerControl`] (the engine's Ctrl-C handler, tests) communicate
//! only through atomics and a single [`Notify`], so the tick loop never
//! takes a lock.
//!
//! [`Arc`]: std::sync::Arc

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Notify;

use crate::config::MIN_TICK_INTERVAL_MS;

/// Control state shared between the scheduler and its owner.
#[derive(Debug)]
pub struct SchedulerControl {
    paused: AtomicBool,
    stop_requested: AtomicBool,
    tick_interval_ms: AtomicU64,
    tick: AtomicU64,
    /// Woken on resume and on stop.
    wake: Notify,
}

impl SchedulerControl {
    /// Create a running (not paused) control with the given cadence.
    ///
    /// Intervals below [`MIN_TICK_INTERVAL_MS`] are raised to it.
    pub fn new(tick_interval_ms: u64) -> Self {
        Self {
            paused: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            tick_interval_ms: AtomicU64::new(tick_interval_ms.max(MIN_TICK_INTERVAL_MS)),
            tick: AtomicU64::new(0),
            wake: Notify::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Whether the scheduler is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause before the next cycle.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume and wake the scheduler.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.wake.notify_waiters();
    }

    /// Wait until resumed or stopped. Returns immediately if running.
    pub async fn wait_while_paused(&self) {
        loop {
            let woken = self.wake.notified();
            if !self.is_paused() || self.is_stop_requested() {
                return;
            }
            woken.await;
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request cancellation. An in-flight cycle completes first.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.wake.notify_waiters();
    }

    /// Whether cancellation has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Resolve once cancellation has been requested.
    pub async fn stopped(&self) {
        loop {
            let woken = self.wake.notified();
            if self.is_stop_requested() {
                return;
            }
            woken.await;
        }
    }

    // -----------------------------------------------------------------------
    // Tick speed and counter
    // -----------------------------------------------------------------------

    /// Current interval between cycles in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Current interval between cycles.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms())
    }

    /// Change the interval. Takes effect after the current sleep.
    ///
    /// Returns the previous interval, or `None` if `ms` is below
    /// [`MIN_TICK_INTERVAL_MS`] and was rejected.
    pub fn set_tick_interval_ms(&self, ms: u64) -> Option<u64> {
        if ms < MIN_TICK_INTERVAL_MS {
            return None;
        }
        Some(self.tick_interval_ms.swap(ms, Ordering::AcqRel))
    }

    /// Number of the last cycle started (0 before the first).
    pub fn current_tick(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }

    /// Start a new cycle and return its number.
    pub fn advance_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::AcqRel).saturating_add(1)
    }

    /// Point-in-time view for logs and status endpoints.
    pub fn status(&self) -> ControlStatus {
        ControlStatus {
            tick: self.current_tick(),
            paused: self.is_paused(),
            stop_requested: self.is_stop_requested(),
            tick_interval_ms: self.tick_interval_ms(),
        }
    }
}

/// Serializable snapshot of [`SchedulerControl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlStatus {
    /// Last cycle started.
    pub tick: u64,
    /// Whether the scheduler is paused.
    pub paused: bool,
    /// Whether cancellation was requested.
    pub stop_requested: bool,
    /// Interval between cycles in milliseconds.
    pub tick_interval_ms: u64,
}
