#![forbid(unsafe_code)]

//! The settings store: current configuration, undo/redo, live edits, and
//! debounced persistence.
//!
//! # Design
//!
//! [`SettingsStore`] is the single writer for the card-style
//! [`Configuration`]. It is a cheap handle (`Rc<RefCell<..>>`); cloning it
//! gives another handle to the **same** store. Readers get immutable
//! `Arc<Configuration>` snapshots and must route every write through the
//! operations below.
//!
//! | Operation        | History effect                                     |
//! |------------------|----------------------------------------------------|
//! | `set`            | push current to past, clear future                 |
//! | `apply_settings` | same as `set`, one entry for the whole patch       |
//! | `reset`          | same as `set`, publishes the built-in defaults     |
//! | `set_live`       | first change snapshots a baseline, clears future   |
//! | `commit_live`    | push the baseline to past if the session changed   |
//! | `undo` / `redo`  | move between stacks, abandon any live session      |
//!
//! Every publish bumps the version, notifies subscribers, and (re)schedules
//! a persistence write one quiet period out. The host event loop calls
//! [`tick`](SettingsStore::tick) to deliver due writes.
//!
//! # Live sessions
//!
//! ```text
//! set_live(a=1) set_live(a=2) set_live(b=5) commit_live()
//!      │             │             │              │
//!      ▼             ▼             ▼              ▼
//!  baseline=X      publish       publish     past += [X]
//!  future=[]       (dirty)       (dirty)     (one undo step)
//! ```
//!
//! One session spans every key edited until it is committed, so a compound
//! gesture is a single undo step.
//!
//! # Failure Modes
//!
//! - **Malformed input**: unknown keys, wrong kinds, and non-finite numbers
//!   return [`SettingsError`] and leave every piece of state untouched.
//! - **Use after teardown**: mutations on a torn-down store panic.
//! - **Persistence failures**: contained by the bridge; never seen here.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use albumcard_core::{Configuration, SettingKey, SettingValue, SettingsError, SettingsPatch};
use tracing::{debug, trace, warn};
use web_time::{Duration, Instant};

use crate::history::{HistoryConfig, SnapshotHistory};
use crate::observe::{SubscriberList, Subscription, notify_all};
use crate::persistence::{
    NoPersistence, PersistenceBridge, SettingsStorage, StoragePersistence,
    load_initial_configuration,
};
use crate::timer::{Clock, DebounceTimer, SystemClock, TimerStats};

/// Default quiet period before persisting.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(200);

type Snapshot = Arc<Configuration>;
type SnapshotCallback = Rc<dyn Fn(&Snapshot)>;

/// Tunables for a [`SettingsStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub history: HistoryConfig,
    /// Wait after the last change before persisting.
    pub quiet_period: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history: HistoryConfig::default(),
            quiet_period: DEFAULT_QUIET_PERIOD,
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn with_history_depth(mut self, max_depth: usize) -> Self {
        self.history = HistoryConfig::new(max_depth);
        self
    }

    #[must_use]
    pub fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period = quiet_period;
        self
    }
}

/// The in-progress continuous edit.
#[derive(Debug)]
struct LiveSession {
    /// Configuration before the first change of the session.
    baseline: Snapshot,
    dirty: bool,
    updates: u32,
}

struct StoreInner {
    current: Snapshot,
    defaults: Snapshot,
    history: SnapshotHistory<Configuration>,
    live: Option<LiveSession>,
    persist_timer: DebounceTimer<Snapshot>,
    version: u64,
    subscribers: SubscriberList<Snapshot>,
    bridge: Rc<dyn PersistenceBridge>,
    clock: Rc<dyn Clock>,
    torn_down: bool,
}

/// A new snapshot plus the callbacks to notify once the borrow is released.
#[must_use]
struct Publication {
    snapshot: Snapshot,
    callbacks: Vec<SnapshotCallback>,
}

impl Publication {
    fn deliver(self) {
        notify_all(&self.callbacks, &self.snapshot);
    }
}

impl StoreInner {
    fn publish(&mut self, next: Snapshot) -> Publication {
        self.current = next;
        self.version += 1;
        let now = self.clock.now();
        self.persist_timer.schedule(Arc::clone(&self.current), now);
        Publication {
            snapshot: Arc::clone(&self.current),
            callbacks: self.subscribers.live(),
        }
    }

    /// Drop any live session without committing it.
    fn abandon_live(&mut self, op: &'static str) {
        if let Some(session) = self.live.take() {
            debug!(
                op,
                dirty = session.dirty,
                updates = session.updates,
                "live session abandoned"
            );
        }
    }

    /// Record the current snapshot as an undo step and publish `next`.
    ///
    /// `key` is `None` for edits spanning several keys.
    fn discrete(&mut self, op: &'static str, key: Option<&SettingKey>, next: Snapshot) -> Publication {
        self.abandon_live(op);
        let previous = Arc::clone(&self.current);
        self.history.record(previous);
        let publication = self.publish(next);
        debug!(
            op,
            key = key.map_or("*", SettingKey::as_str),
            version = self.version,
            past_depth = self.history.past_depth(),
            future_depth = self.history.future_depth(),
            "settings edit"
        );
        publication
    }
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        if self.persist_timer.cancel() {
            debug!(version = self.version, "pending settings write cancelled on drop");
        }
    }
}

/// Handle to the authoritative card-style configuration.
///
/// # Invariants
///
/// 1. `current()` is always a complete record with the defaults' key set.
/// 2. `past` and `future` never exceed the configured depth.
/// 3. Any discrete edit clears `future`; so does the first change of a live
///    session.
/// 4. A live session contributes at most one `past` entry.
/// 5. Each publish increments `version()` by exactly 1.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Rc<RefCell<StoreInner>>,
}

impl fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("SettingsStore")
            .field("version", &inner.version)
            .field("history", &inner.history)
            .field("live", &inner.live.as_ref().map(|s| s.dirty))
            .field("persist_timer", &inner.persist_timer)
            .field("torn_down", &inner.torn_down)
            .finish()
    }
}

impl SettingsStore {
    /// Start building a store over `defaults`.
    #[must_use]
    pub fn builder(defaults: Configuration) -> SettingsStoreBuilder {
        SettingsStoreBuilder::new(defaults)
    }

    /// A store starting from `defaults`, persisting nowhere.
    #[must_use]
    pub fn new(defaults: Configuration) -> Self {
        Self::builder(defaults).build()
    }

    /// A store whose initial configuration is read from `storage` (merged
    /// over `defaults`) and whose writes go back to it.
    #[must_use]
    pub fn with_storage<S>(defaults: Configuration, storage: S, config: StoreConfig) -> Self
    where
        S: SettingsStorage + 'static,
    {
        let initial = load_initial_configuration(&storage, &defaults);
        Self::builder(defaults)
            .initial(initial)
            .config(config)
            .bridge(StoragePersistence::new(storage))
            .build()
    }

    fn state(&self) -> RefMut<'_, StoreInner> {
        let inner = self.inner.borrow_mut();
        assert!(!inner.torn_down, "settings store used after teardown");
        inner
    }

    fn read(&self) -> Ref<'_, StoreInner> {
        self.inner.borrow()
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// The current configuration snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<Configuration> {
        Arc::clone(&self.read().current)
    }

    /// The current value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<SettingValue> {
        self.read().current.get(key).cloned()
    }

    /// The built-in defaults `reset` restores.
    #[must_use]
    pub fn defaults(&self) -> Arc<Configuration> {
        Arc::clone(&self.read().defaults)
    }

    /// Number of publishes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.read().version
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.read().history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.read().history.can_redo()
    }

    /// Past snapshots, oldest first.
    #[must_use]
    pub fn past(&self) -> Vec<Arc<Configuration>> {
        self.read().history.past().cloned().collect()
    }

    /// Future snapshots, most recently undone last.
    #[must_use]
    pub fn future(&self) -> Vec<Arc<Configuration>> {
        self.read().history.future().cloned().collect()
    }

    #[must_use]
    pub fn past_depth(&self) -> usize {
        self.read().history.past_depth()
    }

    #[must_use]
    pub fn future_depth(&self) -> usize {
        self.read().history.future_depth()
    }

    /// Whether a live session is open.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.read().live.is_some()
    }

    /// Whether the open live session has changed anything.
    #[must_use]
    pub fn live_dirty(&self) -> bool {
        self.read().live.as_ref().is_some_and(|s| s.dirty)
    }

    /// Whether a persistence write is waiting for its quiet period.
    #[must_use]
    pub fn persist_pending(&self) -> bool {
        self.read().persist_timer.is_pending()
    }

    /// When the pending write becomes due.
    #[must_use]
    pub fn persist_deadline(&self) -> Option<Instant> {
        self.read().persist_timer.deadline()
    }

    #[must_use]
    pub fn persist_stats(&self) -> TimerStats {
        self.read().persist_timer.stats()
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.read().torn_down
    }

    /// Call `callback` with every newly published snapshot.
    pub fn subscribe(&self, callback: impl Fn(&Arc<Configuration>) + 'static) -> Subscription {
        self.inner.borrow_mut().subscribers.subscribe(callback)
    }

    // ========================================================================
    // Discrete edits
    // ========================================================================

    /// Replace one key. Always one new undo step.
    pub fn set(
        &self,
        key: impl Into<SettingKey>,
        value: impl Into<SettingValue>,
    ) -> Result<(), SettingsError> {
        let key = key.into();
        let publication = {
            let mut inner = self.state();
            let next = inner.current.with(&key, value).inspect_err(|err| {
                warn!(op = "set", key = %key, error = %err, "setting rejected");
            })?;
            inner.discrete("set", Some(&key), Arc::new(next))
        };
        publication.deliver();
        Ok(())
    }

    /// Merge a partial mapping in one undo step.
    pub fn apply_settings(&self, patch: &SettingsPatch) -> Result<(), SettingsError> {
        let publication = {
            let mut inner = self.state();
            let next = inner.current.merged(patch).inspect_err(|err| {
                warn!(op = "apply_settings", error = %err, "settings patch rejected");
            })?;
            trace!(op = "apply_settings", keys = patch.len(), "applying patch");
            inner.discrete("apply_settings", None, Arc::new(next))
        };
        publication.deliver();
        Ok(())
    }

    /// Restore the built-in defaults in one undo step.
    pub fn reset(&self) {
        let publication = {
            let mut inner = self.state();
            let defaults = Arc::clone(&inner.defaults);
            inner.discrete("reset", None, defaults)
        };
        publication.deliver();
    }

    // ========================================================================
    // Live edits
    // ========================================================================

    /// Continuous edit (slider drag, color picker). Coalesced into one undo
    /// step by [`commit_live`](Self::commit_live).
    ///
    /// Setting a value equal to the current one does nothing at all.
    pub fn set_live(
        &self,
        key: impl Into<SettingKey>,
        value: impl Into<SettingValue>,
    ) -> Result<(), SettingsError> {
        let key = key.into();
        let publication = {
            let mut inner = self.state();
            let value = inner.current.check(&key, value.into()).inspect_err(|err| {
                warn!(op = "set_live", key = %key, error = %err, "setting rejected");
            })?;
            if inner.current.get(key.as_str()) == Some(&value) {
                trace!(op = "set_live", key = %key, "unchanged value ignored");
                return Ok(());
            }

            if inner.live.is_none() {
                let baseline = Arc::clone(&inner.current);
                inner.history.clear_future();
                inner.live = Some(LiveSession {
                    baseline,
                    dirty: false,
                    updates: 0,
                });
                debug!(
                    op = "set_live",
                    key = %key,
                    past_depth = inner.history.past_depth(),
                    future_depth = 0u64,
                    "live session started"
                );
            }
            if let Some(session) = inner.live.as_mut() {
                session.dirty = true;
                session.updates += 1;
            }

            let next = inner.current.with(&key, value)?;
            trace!(op = "set_live", key = %key, "live edit");
            inner.publish(Arc::new(next))
        };
        publication.deliver();
        Ok(())
    }

    /// Finish the live session. Returns `true` if it produced an undo step.
    pub fn commit_live(&self) -> bool {
        let mut inner = self.state();
        let Some(session) = inner.live.take() else {
            trace!(op = "commit_live", "no live session");
            return false;
        };
        if !session.dirty {
            trace!(op = "commit_live", "live session made no changes");
            return false;
        }
        let changed_keys = inner.current.changed_keys(&session.baseline).len();
        inner.history.record(session.baseline);
        debug!(
            op = "commit_live",
            updates = session.updates,
            changed_keys,
            past_depth = inner.history.past_depth(),
            "live session committed"
        );
        true
    }

    // ========================================================================
    // Undo / redo
    // ========================================================================

    /// Step back one entry. Returns `false` (and changes nothing) if there is
    /// nothing to undo.
    pub fn undo(&self) -> bool {
        let publication = {
            let mut inner = self.state();
            if !inner.history.can_undo() {
                trace!(op = "undo", "nothing to undo");
                return false;
            }
            inner.abandon_live("undo");
            let current = Arc::clone(&inner.current);
            let Some(previous) = inner.history.undo(current) else {
                return false;
            };
            let publication = inner.publish(previous);
            debug!(
                op = "undo",
                version = inner.version,
                past_depth = inner.history.past_depth(),
                future_depth = inner.history.future_depth(),
                "undo"
            );
            publication
        };
        publication.deliver();
        true
    }

    /// Step forward one entry. Returns `false` (and changes nothing) if there
    /// is nothing to redo.
    pub fn redo(&self) -> bool {
        let publication = {
            let mut inner = self.state();
            if !inner.history.can_redo() {
                trace!(op = "redo", "nothing to redo");
                return false;
            }
            inner.abandon_live("redo");
            let current = Arc::clone(&inner.current);
            let Some(next) = inner.history.redo(current) else {
                return false;
            };
            let publication = inner.publish(next);
            debug!(
                op = "redo",
                version = inner.version,
                past_depth = inner.history.past_depth(),
                future_depth = inner.history.future_depth(),
                "redo"
            );
            publication
        };
        publication.deliver();
        true
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Deliver the pending write if its quiet period has elapsed. Returns
    /// `true` if the bridge was called.
    pub fn tick(&self) -> bool {
        let (due, bridge) = {
            let mut inner = self.inner.borrow_mut();
            let now = inner.clock.now();
            (inner.persist_timer.poll(now), Rc::clone(&inner.bridge))
        };
        match due {
            Some(snapshot) => {
                bridge.persist(&snapshot);
                true
            }
            None => false,
        }
    }

    /// Deliver the pending write now, ignoring the quiet period.
    pub fn flush(&self) -> bool {
        let (due, bridge) = {
            let mut inner = self.inner.borrow_mut();
            (inner.persist_timer.take_pending(), Rc::clone(&inner.bridge))
        };
        match due {
            Some(snapshot) => {
                debug!("flushing pending settings write");
                bridge.persist(&snapshot);
                true
            }
            None => false,
        }
    }

    /// Cancel any pending write without delivering it and refuse further
    /// mutations. Reads keep working.
    pub fn teardown(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.torn_down {
            return;
        }
        inner.torn_down = true;
        inner.abandon_live("teardown");
        let cancelled = inner.persist_timer.cancel();
        debug!(cancelled, version = inner.version, "settings store torn down");
    }
}

/// Builder for [`SettingsStore`].
pub struct SettingsStoreBuilder {
    defaults: Configuration,
    initial: Option<Configuration>,
    config: StoreConfig,
    bridge: Rc<dyn PersistenceBridge>,
    clock: Rc<dyn Clock>,
}

impl fmt::Debug for SettingsStoreBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsStoreBuilder")
            .field("keys", &self.defaults.len())
            .field("has_initial", &self.initial.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SettingsStoreBuilder {
    #[must_use]
    pub fn new(defaults: Configuration) -> Self {
        Self {
            defaults,
            initial: None,
            config: StoreConfig::default(),
            bridge: Rc::new(NoPersistence),
            clock: Rc::new(SystemClock),
        }
    }

    /// Starting configuration (defaults if not set). Merged over the
    /// defaults so the result is always complete.
    #[must_use]
    pub fn initial(mut self, initial: Configuration) -> Self {
        self.initial = Some(initial);
        self
    }

    #[must_use]
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn history_depth(mut self, max_depth: usize) -> Self {
        self.config.history = HistoryConfig::new(max_depth);
        self
    }

    #[must_use]
    pub fn quiet_period(mut self, quiet_period: Duration) -> Self {
        self.config.quiet_period = quiet_period;
        self
    }

    #[must_use]
    pub fn bridge(mut self, bridge: impl PersistenceBridge + 'static) -> Self {
        self.bridge = Rc::new(bridge);
        self
    }

    /// Use an already shared bridge (e.g. to inspect its counters later).
    #[must_use]
    pub fn shared_bridge(mut self, bridge: Rc<dyn PersistenceBridge>) -> Self {
        self.bridge = bridge;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Rc::new(clock);
        self
    }

    #[must_use]
    pub fn build(self) -> SettingsStore {
        let current = match self.initial {
            Some(initial) => {
                let overlay = self.defaults.overlay_json(&initial.to_json());
                for issue in &overlay.issues {
                    warn!(%issue, "initial setting ignored");
                }
                overlay.configuration
            }
            None => self.defaults.clone(),
        };
        debug!(
            keys = current.len(),
            max_depth = self.config.history.max_depth,
            quiet_ms = u64::try_from(self.config.quiet_period.as_millis()).unwrap_or(u64::MAX),
            "settings store created"
        );

        SettingsStore {
            inner: Rc::new(RefCell::new(StoreInner {
                current: Arc::new(current),
                defaults: Arc::new(self.defaults),
                history: SnapshotHistory::new(self.config.history),
                live: None,
                persist_timer: DebounceTimer::new(self.config.quiet_period),
                version: 0,
                subscribers: SubscriberList::default(),
                bridge: self.bridge,
                clock: self.clock,
                torn_down: false,
            })),
        }
    }
}
