#![forbid(unsafe_code)]

//! Clocks and the cancellable debounce timer.
//!
//! The runtime never sleeps or spawns: a [`DebounceTimer`] holds at most one
//! pending value and a deadline, and the host event loop polls it with the
//! current time. Rescheduling replaces the pending value and pushes the
//! deadline out ("latest wins"); cancelling drops it without firing.
//!
//! # State Machine
//!
//! ```text
//!              schedule(v)                 poll(now >= deadline)
//! ┌────────┐ ────────────▶ ┌───────────┐ ───────────────────────▶ fire(v)
//! │  Idle  │               │  Pending  │
//! └────────┘ ◀──────────── └───────────┘ ◀─┐
//!      ▲        cancel()         │         │ schedule(v') resets deadline
//!      │                         └─────────┘
//!      └──────────────── fire / take_pending
//! ```
//!
//! Time comes from a [`Clock`] so tests drive it with [`ManualClock`]
//! instead of sleeping.

use std::cell::Cell;
use std::rc::Rc;

use web_time::{Duration, Instant};

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// A clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    #[must_use]
    pub fn starting_at(start: Instant) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Move time forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Move time forward by `ms` milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

struct Pending<T> {
    value: T,
    /// `None` when the quiet period reaches past the clock's range; such a
    /// value only leaves through `take_pending`.
    deadline: Option<Instant>,
}

/// Counters for timer activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerStats {
    /// Calls to `schedule`.
    pub scheduled: u64,
    /// Schedules that replaced a pending value.
    pub coalesced: u64,
    /// Values delivered by `poll` or `take_pending`.
    pub fired: u64,
    /// Pending values dropped by `cancel`.
    pub cancelled: u64,
}

/// Trailing-edge debounce timer holding the latest scheduled value.
pub struct DebounceTimer<T> {
    quiet_period: Duration,
    pending: Option<Pending<T>>,
    stats: TimerStats,
}

impl<T> std::fmt::Debug for DebounceTimer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebounceTimer")
            .field("quiet_period", &self.quiet_period)
            .field("deadline", &self.deadline())
            .field("stats", &self.stats)
            .finish()
    }
}

impl<T> DebounceTimer<T> {
    #[must_use]
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            pending: None,
            stats: TimerStats::default(),
        }
    }

    /// Schedule `value` to fire one quiet period after `now`, replacing any
    /// pending value. Returns `true` if a pending value was replaced.
    pub fn schedule(&mut self, value: T, now: Instant) -> bool {
        let replaced = self.pending.is_some();
        self.pending = Some(Pending {
            value,
            deadline: now.checked_add(self.quiet_period),
        });
        self.stats.scheduled += 1;
        if replaced {
            self.stats.coalesced += 1;
        }
        replaced
    }

    /// Take the pending value if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let due = self
            .pending
            .as_ref()
            .and_then(|pending| pending.deadline)
            .is_some_and(|deadline| now >= deadline);
        if due { self.take_pending() } else { None }
    }

    /// Take the pending value regardless of its deadline.
    pub fn take_pending(&mut self) -> Option<T> {
        let pending = self.pending.take()?;
        self.stats.fired += 1;
        Some(pending.value)
    }

    /// Drop the pending value without firing. Returns `true` if one existed.
    pub fn cancel(&mut self) -> bool {
        if self.pending.take().is_some() {
            self.stats.cancelled += 1;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().and_then(|pending| pending.deadline)
    }

    /// Time left until the pending value is due, if any.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.pending.as_ref().map(|pending| {
            pending
                .deadline
                .map_or(Duration::MAX, |deadline| deadline.saturating_duration_since(now))
        })
    }

    #[must_use]
    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    #[must_use]
    pub fn stats(&self) -> TimerStats {
        self.stats
    }
}
