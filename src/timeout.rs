//! Wall-clock budget for a scheduling run.
//!
//! The clock is re-measured at most once per check interval; between
//! measurements [`TimeoutManager::is_timed_out`] answers from a cache, so
//! polling it inside tight search loops stays cheap.

use std::cell::Cell;
use std::time::{Duration, Instant};
use thiserror::Error;

/// The run exceeded its time budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("time budget of {limit_ms} ms exceeded after {elapsed_ms} ms")]
pub struct TimeoutExceeded {
    pub limit_ms: u64,
    pub elapsed_ms: u64,
}

/// Tracks elapsed time against a fixed limit.
///
/// # Example
///
/// ```
/// use u_timetable::timeout::TimeoutManager;
///
/// let timer = TimeoutManager::millis(60_000);
/// assert!(!timer.is_timed_out());
/// assert!(timer.remaining_ms() > 0);
/// assert!(timer.time_progress() < 100.0);
/// ```
#[derive(Debug, Clone)]
pub struct TimeoutManager {
    start: Instant,
    limit: Duration,
    check_interval: Duration,
    last_check: Cell<Option<Instant>>,
    expired: Cell<bool>,
}

impl TimeoutManager {
    /// Starts a timer with the given limit, measuring on every poll.
    pub fn new(limit: Duration) -> Self {
        Self {
            start: Instant::now(),
            limit,
            check_interval: Duration::ZERO,
            last_check: Cell::new(None),
            expired: Cell::new(false),
        }
    }

    /// Starts a timer of `ms` milliseconds.
    pub fn millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Re-measures the clock at most once per `interval`.
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Whether the limit has passed. Sticky once true.
    pub fn is_timed_out(&self) -> bool {
        if self.expired.get() {
            return true;
        }
        let now = Instant::now();
        if let Some(last) = self.last_check.get() {
            if now.duration_since(last) < self.check_interval {
                return false;
            }
        }
        self.last_check.set(Some(now));
        let expired = now.duration_since(self.start) >= self.limit;
        self.expired.set(expired);
        expired
    }

    /// Milliseconds since start.
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Milliseconds left, saturating at zero.
    pub fn remaining_ms(&self) -> u64 {
        self.limit.saturating_sub(self.start.elapsed()).as_millis() as u64
    }

    /// Percentage of the budget used, capped at 100.
    pub fn time_progress(&self) -> f64 {
        if self.limit.is_zero() {
            return 100.0;
        }
        (self.start.elapsed().as_secs_f64() / self.limit.as_secs_f64() * 100.0).min(100.0)
    }

    /// `Err` once the limit has passed.
    pub fn check(&self) -> Result<(), TimeoutExceeded> {
        if self.is_timed_out() {
            Err(TimeoutExceeded {
                limit_ms: self.limit.as_millis() as u64,
                elapsed_ms: self.elapsed_ms(),
            })
        } else {
            Ok(())
        }
    }

    /// Restarts the clock.
    pub fn reset(&mut self) {
        self.start = Instant::now();
        self.last_check.set(None);
        self.expired.set(false);
    }
}
