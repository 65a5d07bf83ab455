#![forbid(unsafe_code)]

//! Loading and persisting the card-style configuration.
//!
//! Two seams meet here:
//!
//! - [`SettingsStorage`] reads and writes the raw settings document. The
//!   runtime ships [`MemoryStorage`] and, with the `file-storage` feature,
//!   [`FileStorage`].
//! - [`PersistenceBridge`] is what the settings store calls once a burst of
//!   edits has gone quiet. It is fire-and-forget: nothing it does can fail
//!   back into the store. [`StoragePersistence`] adapts any storage backend,
//!   logging and counting failed writes.
//!
//! # File Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "saved_at_ms": 1760832000000,
//!   "settings": { "cardWidthMm": 63.5, "showQr": true, ... }
//! }
//! ```
//!
//! # Initial load
//!
//! [`load_initial_configuration`] overlays whatever the storage holds onto the
//! built-in defaults. A missing document yields the defaults; an unreadable
//! one yields the defaults plus a warning. Individual keys that are unknown or
//! of the wrong kind are dropped and reported.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use albumcard_core::{Configuration, OverlayIssue};
use tracing::{debug, info_span, warn};
use web_time::Instant;

use crate::error::PersistError;

/// Current settings document version.
pub const FORMAT_VERSION: u64 = 1;

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

/// Receives the latest configuration after edits go quiet.
///
/// Implementations must not panic and must contain their own failures.
pub trait PersistenceBridge {
    fn persist(&self, configuration: &Configuration);
}

impl<F: Fn(&Configuration)> PersistenceBridge for F {
    fn persist(&self, configuration: &Configuration) {
        self(configuration);
    }
}

/// Bridge that discards every write.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPersistence;

impl PersistenceBridge for NoPersistence {
    fn persist(&self, _configuration: &Configuration) {}
}

/// Bridge that writes through a [`SettingsStorage`] backend.
#[derive(Debug)]
pub struct StoragePersistence<S> {
    storage: S,
    writes: Cell<u64>,
    failures: Cell<u64>,
}

impl<S: SettingsStorage> StoragePersistence<S> {
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            writes: Cell::new(0),
            failures: Cell::new(0),
        }
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Successful writes so far.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes.get()
    }

    /// Failed writes so far.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures.get()
    }
}

impl<S: SettingsStorage> PersistenceBridge for StoragePersistence<S> {
    fn persist(&self, configuration: &Configuration) {
        let start = Instant::now();
        let _span = info_span!(
            "settings.persist",
            backend = self.storage.name(),
            keys = configuration.len(),
            duration_us = tracing::field::Empty
        )
        .entered();

        match self.storage.save(&configuration.to_json()) {
            Ok(()) => {
                self.writes.set(self.writes.get() + 1);
                let duration_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
                tracing::Span::current().record("duration_us", duration_us);
                debug!(duration_us, "settings persisted");
            }
            Err(err) => {
                self.failures.set(self.failures.get() + 1);
                warn!(error = %err, "settings write failed; keeping in-memory state");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Raw settings document storage.
pub trait SettingsStorage {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Read the stored settings object. `Ok(None)` if nothing was stored.
    fn load(&self) -> Result<Option<serde_json::Value>, PersistError>;

    /// Replace the stored settings object.
    fn save(&self, settings: &serde_json::Value) -> Result<(), PersistError>;
}

impl<S: SettingsStorage + ?Sized> SettingsStorage for Rc<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn load(&self) -> Result<Option<serde_json::Value>, PersistError> {
        (**self).load()
    }

    fn save(&self, settings: &serde_json::Value) -> Result<(), PersistError> {
        (**self).save(settings)
    }
}

/// In-process storage. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Rc<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    slot: RefCell<Option<serde_json::Value>>,
    saves: Cell<u64>,
    reject_writes: Cell<bool>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with a settings object.
    #[must_use]
    pub fn with_settings(settings: serde_json::Value) -> Self {
        let storage = Self::new();
        *storage.inner.slot.borrow_mut() = Some(settings);
        storage
    }

    /// The currently stored object.
    #[must_use]
    pub fn stored(&self) -> Option<serde_json::Value> {
        self.inner.slot.borrow().clone()
    }

    /// Number of successful saves.
    #[must_use]
    pub fn saves(&self) -> u64 {
        self.inner.saves.get()
    }

    /// Make subsequent saves fail (quota exceeded, private mode, ...).
    pub fn reject_writes(&self, reject: bool) {
        self.inner.reject_writes.set(reject);
    }
}

impl SettingsStorage for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn load(&self) -> Result<Option<serde_json::Value>, PersistError> {
        Ok(self.stored())
    }

    fn save(&self, settings: &serde_json::Value) -> Result<(), PersistError> {
        if self.inner.reject_writes.get() {
            return Err(PersistError::Rejected("storage is read-only".into()));
        }
        *self.inner.slot.borrow_mut() = Some(settings.clone());
        self.inner.saves.set(self.inner.saves.get() + 1);
        Ok(())
    }
}

#[cfg(feature = "file-storage")]
pub use file::FileStorage;

#[cfg(feature = "file-storage")]
mod file {
    use std::path::{Path, PathBuf};

    use serde::{Deserialize, Serialize};

    use super::{FORMAT_VERSION, SettingsStorage};
    use crate::error::PersistError;

    /// On-disk representation of the settings document.
    #[derive(Debug, Serialize, Deserialize)]
    struct SettingsFile {
        version: u64,
        #[serde(default)]
        saved_at_ms: u64,
        settings: serde_json::Value,
    }

    /// JSON settings file.
    ///
    /// Writes go to a sibling temp file which is then renamed over the
    /// target, so a crash mid-write never leaves a truncated document. The
    /// parent directory must already exist.
    #[derive(Debug, Clone)]
    pub struct FileStorage {
        path: PathBuf,
    }

    impl FileStorage {
        #[must_use]
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }

        #[must_use]
        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    impl SettingsStorage for FileStorage {
        fn name(&self) -> &'static str {
            "file"
        }

        fn load(&self) -> Result<Option<serde_json::Value>, PersistError> {
            if !self.path.exists() {
                return Ok(None);
            }
            let contents = std::fs::read_to_string(&self.path)?;
            let file: SettingsFile = serde_json::from_str(&contents)?;
            if file.version != FORMAT_VERSION {
                return Err(PersistError::UnsupportedVersion {
                    found: file.version,
                    expected: FORMAT_VERSION,
                });
            }
            Ok(Some(file.settings))
        }

        fn save(&self, settings: &serde_json::Value) -> Result<(), PersistError> {
            let saved_at_ms = web_time::SystemTime::now()
                .duration_since(web_time::SystemTime::UNIX_EPOCH)
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
                .unwrap_or_default();
            let file = SettingsFile {
                version: FORMAT_VERSION,
                saved_at_ms,
                settings: settings.clone(),
            };
            let json = serde_json::to_string_pretty(&file)?;

            let temp = self.path.with_extension("json.tmp");
            std::fs::write(&temp, json)?;
            std::fs::rename(&temp, &self.path)?;
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Initial load
// ---------------------------------------------------------------------------

/// Where the initial configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Nothing stored; built-in defaults.
    Defaults,
    /// Stored settings overlaid on the defaults.
    Storage,
    /// Stored settings could not be read; built-in defaults.
    Fallback,
}

/// Outcome of [`load_initial_configuration_with_report`].
#[derive(Debug, Clone)]
pub struct InitialLoad {
    pub configuration: Configuration,
    pub source: LoadSource,
    /// Keys dropped while overlaying stored settings.
    pub issues: Vec<OverlayIssue>,
}

/// Read the starting configuration: stored settings merged over `defaults`.
#[must_use]
pub fn load_initial_configuration(
    storage: &dyn SettingsStorage,
    defaults: &Configuration,
) -> Configuration {
    load_initial_configuration_with_report(storage, defaults).configuration
}

/// Like [`load_initial_configuration`] but also reports what happened.
#[must_use]
pub fn load_initial_configuration_with_report(
    storage: &dyn SettingsStorage,
    defaults: &Configuration,
) -> InitialLoad {
    match storage.load() {
        Ok(None) => {
            debug!(backend = storage.name(), "no stored settings; using defaults");
            InitialLoad {
                configuration: defaults.clone(),
                source: LoadSource::Defaults,
                issues: Vec::new(),
            }
        }
        Ok(Some(stored)) => {
            let overlay = defaults.overlay_json(&stored);
            for issue in &overlay.issues {
                warn!(backend = storage.name(), %issue, "stored setting ignored");
            }
            debug!(
                backend = storage.name(),
                issues = overlay.issues.len(),
                "stored settings loaded"
            );
            InitialLoad {
                configuration: overlay.configuration,
                source: LoadSource::Storage,
                issues: overlay.issues,
            }
        }
        Err(err) => {
            warn!(backend = storage.name(), error = %err, "stored settings unreadable; using defaults");
            InitialLoad {
                configuration: defaults.clone(),
                source: LoadSource::Fallback,
                issues: Vec::new(),
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
