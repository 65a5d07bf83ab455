#![forbid(unsafe_code)]

//! Settings value model.
//!
//! A [`Configuration`] is a complete record of named card-style options. The
//! settings store treats it as an opaque key→value mapping: every key that
//! exists in the built-in defaults is always present, and every value keeps
//! the kind its default declared.
//!
//! # Invariants
//!
//! 1. A `Configuration` is never partial. Updates go through
//!    [`Configuration::with`] or [`Configuration::merged`], which return a new
//!    complete record or reject the whole update.
//! 2. A key's [`ValueKind`] never changes after construction.
//! 3. `Number` values are always finite, so `PartialEq` on values is a total
//!    per-key equality.
//!
//! # Persisted form
//!
//! [`Configuration::to_json`] writes a flat JSON object. Colors are written
//! as `"#rrggbb"`. Reading goes through [`Configuration::overlay_json`], which
//! coerces each persisted value by the kind of the current value and reports
//! anything it had to drop.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Name of a single setting.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingKey(String);

impl SettingKey {
    /// Create a key from any string-like value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SettingKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SettingKey {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for SettingKey {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&SettingKey> for SettingKey {
    fn from(key: &SettingKey) -> Self {
        key.clone()
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

/// An sRGB color as used by the card theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` or `#rgb` (leading `#` optional, case-insensitive).
    pub fn parse_hex(input: &str) -> Result<Self, SettingsError> {
        let invalid = || SettingsError::InvalidColor(input.to_owned());
        let hex = input.trim().strip_prefix('#').unwrap_or(input.trim());
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
        match hex.len() {
            6 => Ok(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let expand = |i: usize| channel(&hex[i..=i]).map(|v| v * 17);
                Ok(Self::new(expand(0)?, expand(1)?, expand(2)?))
            }
            _ => Err(invalid()),
        }
    }
}

impl FromStr for Rgb {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// The kind of a setting value. Fixed per key by the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Integer,
    Number,
    Text,
    Color,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Text => "text",
            Self::Color => "color",
        };
        f.write_str(name)
    }
}

/// A single setting value.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    Color(Rgb),
}

impl SettingValue {
    /// The kind of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Integer(_) => ValueKind::Integer,
            Self::Number(_) => ValueKind::Number,
            Self::Text(_) => ValueKind::Text,
            Self::Color(_) => ValueKind::Color,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view; integers widen to `f64`.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_color(&self) -> Option<Rgb> {
        match self {
            Self::Color(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to the JSON form used for persistence.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(v) => serde_json::Value::Bool(*v),
            Self::Integer(v) => serde_json::Value::from(*v),
            Self::Number(v) => serde_json::Number::from_f64(*v)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Text(v) => serde_json::Value::String(v.clone()),
            Self::Color(v) => serde_json::Value::String(v.to_string()),
        }
    }

    /// Read a persisted JSON value as the same kind as `self`.
    ///
    /// Returns `None` when the JSON cannot represent a value of that kind.
    #[must_use]
    pub fn coerce_json_like(&self, json: &serde_json::Value) -> Option<SettingValue> {
        match self.kind() {
            ValueKind::Bool => json.as_bool().map(Self::Bool),
            ValueKind::Integer => json.as_i64().map(Self::Integer).or_else(|| {
                json.as_f64()
                    .filter(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64)
                    .map(|v| Self::Integer(v as i64))
            }),
            ValueKind::Number => json
                .as_f64()
                .filter(|v| v.is_finite())
                .map(Self::Number),
            ValueKind::Text => json.as_str().map(|s| Self::Text(s.to_owned())),
            ValueKind::Color => json
                .as_str()
                .and_then(|s| Rgb::parse_hex(s).ok())
                .map(Self::Color),
        }
    }

    /// Normalize `self` for storage in a slot whose current value is
    /// `template`. Integers widen into number slots and hex strings parse
    /// into color slots; everything else must match exactly.
    fn fit_to(self, key: &SettingKey, template: &SettingValue) -> Result<Self, SettingsError> {
        let value = match (template.kind(), self) {
            (ValueKind::Number, Self::Integer(v)) => Self::Number(v as f64),
            (ValueKind::Color, Self::Text(hex)) => Self::Color(Rgb::parse_hex(&hex)?),
            (_, value) => value,
        };
        if value.kind() != template.kind() {
            return Err(SettingsError::TypeMismatch {
                key: key.clone(),
                expected: template.kind(),
                found: value.kind(),
            });
        }
        if let Self::Number(v) = value
            && !v.is_finite()
        {
            return Err(SettingsError::NonFinite { key: key.clone() });
        }
        Ok(value)
    }
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for SettingValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for SettingValue {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<u32> for SettingValue {
    fn from(v: u32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Rgb> for SettingValue {
    fn from(v: Rgb) -> Self {
        Self::Color(v)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Rejected setting update.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsError {
    /// The key does not exist in the configuration.
    UnknownKey(SettingKey),
    /// The value kind does not match the key's declared kind.
    TypeMismatch {
        key: SettingKey,
        expected: ValueKind,
        found: ValueKind,
    },
    /// A number value was NaN or infinite.
    NonFinite { key: SettingKey },
    /// A color string could not be parsed.
    InvalidColor(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKey(key) => write!(f, "unknown setting '{key}'"),
            Self::TypeMismatch {
                key,
                expected,
                found,
            } => write!(f, "setting '{key}' expects {expected}, got {found}"),
            Self::NonFinite { key } => write!(f, "setting '{key}' must be a finite number"),
            Self::InvalidColor(input) => write!(f, "invalid color '{input}'"),
        }
    }
}

impl std::error::Error for SettingsError {}

// ---------------------------------------------------------------------------
// Patches
// ---------------------------------------------------------------------------

/// A partial mapping of keys to new values, applied in one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    entries: BTreeMap<SettingKey, SettingValue>,
}

impl SettingsPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<SettingKey>, value: impl Into<SettingValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, key: impl Into<SettingKey>, value: impl Into<SettingValue>) {
        self.entries.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SettingKey, &SettingValue)> {
        self.entries.iter()
    }
}

impl<K: Into<SettingKey>, V: Into<SettingValue>> FromIterator<(K, V)> for SettingsPatch {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Something dropped while overlaying persisted JSON onto a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayIssue {
    /// The persisted document was not a JSON object.
    NotAnObject,
    /// A persisted key no longer exists.
    UnknownKey(String),
    /// A persisted value could not be read as the key's kind.
    KindMismatch { key: SettingKey, expected: ValueKind },
}

impl fmt::Display for OverlayIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => f.write_str("persisted settings are not a JSON object"),
            Self::UnknownKey(key) => write!(f, "dropped unknown setting '{key}'"),
            Self::KindMismatch { key, expected } => {
                write!(f, "kept default for '{key}': persisted value is not a {expected}")
            }
        }
    }
}

/// Result of [`Configuration::overlay_json`].
#[derive(Debug, Clone)]
pub struct Overlay {
    pub configuration: Configuration,
    pub issues: Vec<OverlayIssue>,
}

/// A complete record of card-style settings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Configuration {
    values: BTreeMap<SettingKey, SettingValue>,
}

impl Configuration {
    /// Build a configuration from its full set of entries.
    ///
    /// This defines the key set and each key's kind. Later updates can only
    /// replace values, never add keys.
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Result<Self, SettingsError>
    where
        K: Into<SettingKey>,
        V: Into<SettingValue>,
    {
        let mut values = BTreeMap::new();
        for (key, value) in entries {
            let key = key.into();
            let value = value.into();
            if let SettingValue::Number(v) = value
                && !v.is_finite()
            {
                return Err(SettingsError::NonFinite { key });
            }
            values.insert(key, value);
        }
        Ok(Self { values })
    }

    /// Build from entries known to be finite (built-in tables).
    pub(crate) fn from_trusted(entries: impl IntoIterator<Item = (&'static str, SettingValue)>) -> Self {
        Self {
            values: entries
                .into_iter()
                .map(|(key, value)| (SettingKey::from(key), value))
                .collect(),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(SettingValue::as_bool)
    }

    #[must_use]
    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(SettingValue::as_number)
    }

    #[must_use]
    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(SettingValue::as_text)
    }

    #[must_use]
    pub fn get_color(&self, key: &str) -> Option<Rgb> {
        self.get(key).and_then(SettingValue::as_color)
    }

    pub fn keys(&self) -> impl Iterator<Item = &SettingKey> {
        self.values.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SettingKey, &SettingValue)> {
        self.values.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Validate `value` for `key` and return it in stored form.
    pub fn check(
        &self,
        key: &SettingKey,
        value: SettingValue,
    ) -> Result<SettingValue, SettingsError> {
        let template = self
            .values
            .get(key)
            .ok_or_else(|| SettingsError::UnknownKey(key.clone()))?;
        value.fit_to(key, template)
    }

    /// A new configuration with one key replaced.
    pub fn with(
        &self,
        key: impl Into<SettingKey>,
        value: impl Into<SettingValue>,
    ) -> Result<Self, SettingsError> {
        let key = key.into();
        let value = self.check(&key, value.into())?;
        let mut next = self.clone();
        next.values.insert(key, value);
        Ok(next)
    }

    /// A new configuration with every entry of `patch` applied.
    ///
    /// All entries are validated before anything is applied.
    pub fn merged(&self, patch: &SettingsPatch) -> Result<Self, SettingsError> {
        let checked = patch
            .iter()
            .map(|(key, value)| Ok((key.clone(), self.check(key, value.clone())?)))
            .collect::<Result<Vec<_>, SettingsError>>()?;
        let mut next = self.clone();
        next.values.extend(checked);
        Ok(next)
    }

    /// Keys whose values differ between `self` and `other`.
    #[must_use]
    pub fn changed_keys(&self, other: &Configuration) -> Vec<SettingKey> {
        self.values
            .iter()
            .filter(|(key, value)| other.values.get(*key) != Some(*value))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// JSON object form used for persistence.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.as_str().to_owned(), v.to_json()))
                .collect(),
        )
    }

    /// Overlay persisted JSON onto this configuration.
    ///
    /// Missing keys keep their current values, unknown keys are dropped, and
    /// values of the wrong kind keep the current value. The result is always
    /// complete.
    #[must_use]
    pub fn overlay_json(&self, json: &serde_json::Value) -> Overlay {
        let mut configuration = self.clone();
        let mut issues = Vec::new();

        let Some(object) = json.as_object() else {
            issues.push(OverlayIssue::NotAnObject);
            return Overlay {
                configuration,
                issues,
            };
        };

        for (name, raw) in object {
            let Some((key, template)) = self.values.get_key_value(name.as_str()) else {
                issues.push(OverlayIssue::UnknownKey(name.clone()));
                continue;
            };
            match template.coerce_json_like(raw) {
                Some(value) => {
                    configuration.values.insert(key.clone(), value);
                }
                None => issues.push(OverlayIssue::KindMismatch {
                    key: key.clone(),
                    expected: template.kind(),
                }),
            }
        }

        Overlay {
            configuration,
            issues,
        }
    }
}
