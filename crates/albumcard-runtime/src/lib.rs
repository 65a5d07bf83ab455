#![forbid(unsafe_code)]

//! Album Card Studio Runtime
//!
//! The settings history manager behind the card-style editor.
//!
//! # Key Components
//!
//! - [`SettingsStore`] - Current configuration with undo/redo and live edits
//! - [`SnapshotHistory`] - Bounded past/future stacks of snapshots
//! - [`DebounceTimer`] - Cancellable quiet-period timer polled by the host
//! - [`PersistenceBridge`] - Fire-and-forget write of a snapshot
//! - [`SettingsStorage`] - Where persisted settings live ([`MemoryStorage`], `FileStorage`)
//! - [`KeyListenerHub`] / [`UndoShortcuts`] - Global undo/redo chords
//! - [`SettingsProvider`] - Scoped access to a store for the current thread
//! - [`StudioConfig`] - Runtime tunables from TOML and the environment
//!
//! # How it fits in the system
//! Presentation code reads snapshots from the store and routes every write
//! through its operations. The host event loop feeds key events to the hub
//! and calls [`SettingsStore::tick`] so pending writes reach storage once
//! edits go quiet.

pub mod config;
pub mod error;
pub mod history;
pub mod observe;
pub mod persistence;
pub mod provider;
pub mod shortcuts;
pub mod store;
pub mod timer;

pub use config::StudioConfig;
pub use error::{ConfigError, PersistError};
pub use history::{HistoryConfig, SnapshotHistory};
pub use observe::Subscription;
#[cfg(feature = "file-storage")]
pub use persistence::FileStorage;
pub use persistence::{
    InitialLoad, LoadSource, MemoryStorage, NoPersistence, PersistenceBridge, SettingsStorage,
    StoragePersistence, load_initial_configuration, load_initial_configuration_with_report,
};
pub use provider::{SettingsProvider, try_settings, use_settings};
pub use shortcuts::{Dispatch, KeyListenerHub, KeyOutcome, ListenerGuard, UndoShortcuts};
pub use store::{SettingsStore, SettingsStoreBuilder, StoreConfig};
pub use timer::{Clock, DebounceTimer, ManualClock, SystemClock, TimerStats};
