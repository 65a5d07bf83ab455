#![forbid(unsafe_code)]

//! Bounded linear undo/redo history of immutable snapshots.
//!
//! [`SnapshotHistory`] keeps the configurations that came *before* the
//! current one (`past`) and the ones superseded by undo (`future`). The
//! current value itself lives with the owner; it is handed in on
//! [`undo`](SnapshotHistory::undo) and [`redo`](SnapshotHistory::redo) and
//! moves onto the opposite stack.
//!
//! Snapshots are stored as [`Arc`]s so readers that still hold an older
//! configuration share it with the history instead of copying it.
//!
//! # Architecture
//!
//! ```text
//! record(A) record(B) record(C)        current = D
//! ┌──────────────────────────────────────────────────┐
//! │ past:   [A, B, C]                                │
//! │ future: []                                       │
//! └──────────────────────────────────────────────────┘
//!
//! undo(D) -> C, undo(C) -> B           current = B
//! ┌──────────────────────────────────────────────────┐
//! │ past:   [A]                                      │
//! │ future: [D, C]                                   │
//! └──────────────────────────────────────────────────┘
//!
//! record(B): new branch, clears future    current = E
//! ┌──────────────────────────────────────────────────┐
//! │ past:   [A, B]                                   │
//! │ future: []                                       │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! # Invariants
//!
//! 1. `past.len() <= config.max_depth` and `future.len() <= config.max_depth`
//!    after every operation.
//! 2. `record` always clears `future`.
//! 3. Overflow evicts the oldest entry of the stack that grew (front of the
//!    deque), silently.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Default maximum number of undo steps.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Configuration for the snapshot history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of snapshots retained on each stack.
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl HistoryConfig {
    /// Create a configuration with the given depth limit (at least 1).
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    /// Create an unlimited configuration (for testing).
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            max_depth: usize::MAX,
        }
    }
}

/// Linear undo/redo history over `Arc<T>` snapshots.
pub struct SnapshotHistory<T> {
    /// Prior snapshots, oldest at front.
    past: VecDeque<Arc<T>>,
    /// Undone snapshots, most recently undone at back.
    future: VecDeque<Arc<T>>,
    config: HistoryConfig,
}

impl<T> fmt::Debug for SnapshotHistory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotHistory")
            .field("past_depth", &self.past.len())
            .field("future_depth", &self.future.len())
            .field("config", &self.config)
            .finish()
    }
}

impl<T> Default for SnapshotHistory<T> {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl<T> SnapshotHistory<T> {
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            past: VecDeque::new(),
            future: VecDeque::new(),
            config,
        }
    }

    // ====================================================================
    // Core Operations
    // ====================================================================

    /// Record `previous` as a new undo step (new branch: clears future).
    pub fn record(&mut self, previous: Arc<T>) {
        self.future.clear();
        Self::push_bounded(&mut self.past, previous, self.config.max_depth);
    }

    /// Step back: returns the most recent past snapshot and moves `current`
    /// onto the future stack. `None` (and no change) if past is empty.
    pub fn undo(&mut self, current: Arc<T>) -> Option<Arc<T>> {
        let previous = self.past.pop_back()?;
        Self::push_bounded(&mut self.future, current, self.config.max_depth);
        Some(previous)
    }

    /// Step forward: returns the most recently undone snapshot and moves
    /// `current` onto the past stack. `None` (and no change) if future is
    /// empty.
    pub fn redo(&mut self, current: Arc<T>) -> Option<Arc<T>> {
        let next = self.future.pop_back()?;
        Self::push_bounded(&mut self.past, current, self.config.max_depth);
        Some(next)
    }

    /// Drop all redo entries.
    pub fn clear_future(&mut self) {
        self.future.clear();
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    // ====================================================================
    // Query
    // ====================================================================

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    #[must_use]
    pub fn past_depth(&self) -> usize {
        self.past.len()
    }

    #[must_use]
    pub fn future_depth(&self) -> usize {
        self.future.len()
    }

    /// Past snapshots, oldest first.
    pub fn past(&self) -> impl DoubleEndedIterator<Item = &Arc<T>> + ExactSizeIterator {
        self.past.iter()
    }

    /// Future snapshots, most recently undone last.
    pub fn future(&self) -> impl DoubleEndedIterator<Item = &Arc<T>> + ExactSizeIterator {
        self.future.iter()
    }

    #[must_use]
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    // ====================================================================
    // Maintenance
    // ====================================================================

    fn push_bounded(stack: &mut VecDeque<Arc<T>>, item: Arc<T>, max_depth: usize) {
        stack.push_back(item);
        while stack.len() > max_depth {
            stack.pop_front();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
