#![forbid(unsafe_code)]

//! Studio configuration: the runtime tunables, loaded from TOML at startup.
//!
//! ```toml
//! # albumcard.toml
//! [history]
//! max_depth = 100
//!
//! [persistence]
//! quiet_period_ms = 200
//! path = "card-settings.json"
//!
//! [shortcuts]
//! primary_modifier = "auto"   # auto | ctrl | super
//! enabled = true
//! ```
//!
//! Every field has a default, so an empty file (or no file) gives the
//! stock behavior. Environment variables override the file:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `ALBUMCARD_HISTORY_DEPTH` | `history.max_depth` |
//! | `ALBUMCARD_PERSIST_QUIET_MS` | `persistence.quiet_period_ms` |
//! | `ALBUMCARD_PRIMARY_MODIFIER` | `shortcuts.primary_modifier` |
//! | `ALBUMCARD_DISABLE_SHORTCUTS` | `shortcuts.enabled` (inverted) |

use std::path::{Path, PathBuf};

use albumcard_core::{Configuration, PrimaryModifier, ShortcutConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use web_time::Duration;

use crate::error::ConfigError;
use crate::history::{DEFAULT_MAX_DEPTH, HistoryConfig};
use crate::store::{DEFAULT_QUIET_PERIOD, SettingsStore, StoreConfig};

/// Largest accepted undo depth.
pub const MAX_HISTORY_DEPTH: usize = 10_000;
/// Longest accepted persistence quiet period, in milliseconds.
pub const MAX_QUIET_PERIOD_MS: u64 = 10_000;

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub history: HistorySection,
    pub persistence: PersistenceSection,
    pub shortcuts: ShortcutSection,
}

/// `[history]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySection {
    /// Undo steps kept on each stack.
    pub max_depth: usize,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// `[persistence]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceSection {
    /// Quiet period after the last change before writing.
    pub quiet_period_ms: u64,
    /// Settings file. `None` keeps settings in memory only.
    pub path: Option<PathBuf>,
}

impl Default for PersistenceSection {
    fn default() -> Self {
        Self {
            quiet_period_ms: u64::try_from(DEFAULT_QUIET_PERIOD.as_millis()).unwrap_or(u64::MAX),
            path: None,
        }
    }
}

/// `[shortcuts]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortcutSection {
    /// `auto`, `ctrl`, or `super`.
    pub primary_modifier: String,
    pub enabled: bool,
}

impl Default for ShortcutSection {
    fn default() -> Self {
        Self {
            primary_modifier: PrimaryModifier::Auto.as_str().to_owned(),
            enabled: true,
        }
    }
}

impl StudioConfig {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Startup path: optional file, then environment, then clamping.
    ///
    /// A missing file means defaults; an unreadable or malformed one is an
    /// error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "loading studio config");
                Self::from_toml_file(path)?
            }
            Some(path) => {
                debug!(path = %path.display(), "studio config not found; using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        Ok(base.with_env_overrides().validated())
    }

    /// Apply the `ALBUMCARD_*` environment variables.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides read through `lookup` (variable name to value).
    /// Unparseable values are logged and ignored.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(val) = lookup("ALBUMCARD_HISTORY_DEPTH") {
            match val.trim().parse() {
                Ok(depth) => self.history.max_depth = depth,
                Err(_) => warn!(value = %val, "ignoring ALBUMCARD_HISTORY_DEPTH"),
            }
        }
        if let Some(val) = lookup("ALBUMCARD_PERSIST_QUIET_MS") {
            match val.trim().parse() {
                Ok(ms) => self.persistence.quiet_period_ms = ms,
                Err(_) => warn!(value = %val, "ignoring ALBUMCARD_PERSIST_QUIET_MS"),
            }
        }
        if let Some(val) = lookup("ALBUMCARD_PRIMARY_MODIFIER") {
            match val.parse::<PrimaryModifier>() {
                Ok(primary) => self.shortcuts.primary_modifier = primary.as_str().to_owned(),
                Err(_) => warn!(value = %val, "ignoring ALBUMCARD_PRIMARY_MODIFIER"),
            }
        }
        if let Some(val) = lookup("ALBUMCARD_DISABLE_SHORTCUTS") {
            let val = val.trim();
            self.shortcuts.enabled = !(val == "1" || val.eq_ignore_ascii_case("true"));
        }
        self
    }

    /// Validate the configuration, returning a list of errors.
    ///
    /// Returns an empty vec if the configuration is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.history.max_depth == 0 || self.history.max_depth > MAX_HISTORY_DEPTH {
            errors.push(format!(
                "history.max_depth must be in 1..={MAX_HISTORY_DEPTH}, got {}",
                self.history.max_depth
            ));
        }
        if self.persistence.quiet_period_ms > MAX_QUIET_PERIOD_MS {
            errors.push(format!(
                "persistence.quiet_period_ms must be <= {MAX_QUIET_PERIOD_MS}, got {}",
                self.persistence.quiet_period_ms
            ));
        }
        if self
            .shortcuts
            .primary_modifier
            .parse::<PrimaryModifier>()
            .is_err()
        {
            errors.push(format!(
                "shortcuts.primary_modifier must be auto, ctrl or super, got {:?}",
                self.shortcuts.primary_modifier
            ));
        }

        errors
    }

    /// `self` if valid, otherwise every problem as [`ConfigError::Validation`].
    pub fn checked(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Clamp out-of-range values and replace unknown modifiers with `auto`.
    #[must_use]
    pub fn validated(mut self) -> Self {
        for problem in self.validate() {
            warn!(%problem, "studio config adjusted");
        }
        self.history.max_depth = self.history.max_depth.clamp(1, MAX_HISTORY_DEPTH);
        self.persistence.quiet_period_ms = self.persistence.quiet_period_ms.min(MAX_QUIET_PERIOD_MS);
        self.shortcuts.primary_modifier = self.primary_modifier().as_str().to_owned();
        self
    }

    /// The configured modifier, `auto` if unrecognized.
    #[must_use]
    pub fn primary_modifier(&self) -> PrimaryModifier {
        self.shortcuts.primary_modifier.parse().unwrap_or_default()
    }

    #[must_use]
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.persistence.quiet_period_ms)
    }

    #[must_use]
    pub fn to_history_config(&self) -> HistoryConfig {
        HistoryConfig::new(self.history.max_depth)
    }

    #[must_use]
    pub fn to_store_config(&self) -> StoreConfig {
        StoreConfig {
            history: self.to_history_config(),
            quiet_period: self.quiet_period(),
        }
    }

    #[must_use]
    pub fn to_shortcut_config(&self) -> ShortcutConfig {
        ShortcutConfig {
            primary: self.primary_modifier(),
            enabled: self.shortcuts.enabled,
        }
    }

    /// A store over `defaults` wired to the configured settings file, or
    /// memory-only when no path is set.
    #[must_use]
    pub fn open_store(&self, defaults: Configuration) -> SettingsStore {
        #[cfg(feature = "file-storage")]
        {
            if let Some(path) = &self.persistence.path {
                let storage = crate::persistence::FileStorage::new(path);
                return SettingsStore::with_storage(defaults, storage, self.to_store_config());
            }
        }
        SettingsStore::builder(defaults)
            .config(self.to_store_config())
            .build()
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}
