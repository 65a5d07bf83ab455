#![forbid(unsafe_code)]

//! Runtime error types.
//!
//! Store mutations reject malformed input with
//! [`SettingsError`](albumcard_core::SettingsError). The types here cover the
//! edges of the runtime that touch the outside world: persisted settings and
//! the studio configuration file. Neither ever reaches the store: persistence
//! failures are contained by the bridge, and configuration errors surface at
//! startup before a store exists.

use std::fmt;

/// Failure reading or writing persisted settings.
#[derive(Debug)]
pub enum PersistError {
    /// I/O failure on the settings file.
    Io(std::io::Error),
    /// The settings document is not valid JSON.
    Json(serde_json::Error),
    /// The settings document was written by an incompatible version.
    UnsupportedVersion { found: u64, expected: u64 },
    /// The storage backend refused the write.
    Rejected(String),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "settings I/O: {err}"),
            Self::Json(err) => write!(f, "settings JSON: {err}"),
            Self::UnsupportedVersion { found, expected } => write!(
                f,
                "unsupported settings file version: {found} (expected {expected})"
            ),
            Self::Rejected(msg) => write!(f, "settings write rejected: {msg}"),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::UnsupportedVersion { .. } | Self::Rejected(_) => None,
        }
    }
}

impl From<std::io::Error> for PersistError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

/// Failure loading the studio configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    Toml(toml::de::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Toml(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
