#![forbid(unsafe_code)]

//! Undo/redo key chord mapping.
//!
//! [`ShortcutMapper`] turns key events into [`ShortcutAction`]s using the
//! platform's primary modifier:
//!
//! | Chord                       | Action |
//! |-----------------------------|--------|
//! | Primary + `z`               | Undo   |
//! | Primary + Shift + `z`       | Redo   |
//!
//! # Exclusions
//!
//! - Focus inside a free-text target ([`FocusTarget::is_text_editable`])
//!   never maps, so native text undo keeps working.
//! - Release events never map.
//! - Chords with Alt held never map.
//!
//! # Example
//!
//! ```
//! use albumcard_core::event::{FocusTarget, KeyCode, KeyEvent, Modifiers};
//! use albumcard_core::keybinding::{PrimaryModifier, ShortcutAction, ShortcutConfig, ShortcutMapper};
//!
//! let mapper = ShortcutMapper::new(
//!     ShortcutConfig::default().with_primary(PrimaryModifier::Ctrl),
//! );
//! let ctrl_z = KeyEvent::new(KeyCode::Char('z')).with_modifiers(Modifiers::CTRL);
//!
//! assert_eq!(mapper.map(&ctrl_z, FocusTarget::None), Some(ShortcutAction::Undo));
//! assert_eq!(mapper.map(&ctrl_z, FocusTarget::TextInput), None);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::event::{FocusTarget, KeyEvent, KeyEventKind, Modifiers};

/// Which modifier acts as the "primary" shortcut modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimaryModifier {
    /// Command on macOS, Ctrl everywhere else.
    #[default]
    Auto,
    Ctrl,
    Super,
}

impl PrimaryModifier {
    /// The concrete modifier flag for this platform.
    #[must_use]
    pub fn resolve(self) -> Modifiers {
        match self {
            Self::Auto if cfg!(target_os = "macos") => Modifiers::SUPER,
            Self::Auto | Self::Ctrl => Modifiers::CTRL,
            Self::Super => Modifiers::SUPER,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Ctrl => "ctrl",
            Self::Super => "super",
        }
    }
}

impl FromStr for PrimaryModifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "ctrl" | "control" => Ok(Self::Ctrl),
            "super" | "cmd" | "meta" | "command" => Ok(Self::Super),
            other => Err(format!("unknown primary modifier '{other}'")),
        }
    }
}

impl fmt::Display for PrimaryModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for undo/redo chord mapping.
///
/// # Environment Variables
///
/// | Variable | Type | Default | Description |
/// |----------|------|---------|-------------|
/// | `ALBUMCARD_PRIMARY_MODIFIER` | `auto`/`ctrl`/`super` | `auto` | Shortcut modifier |
/// | `ALBUMCARD_DISABLE_SHORTCUTS` | bool | false | Turn chord mapping off |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutConfig {
    pub primary: PrimaryModifier,
    pub enabled: bool,
}

impl Default for ShortcutConfig {
    fn default() -> Self {
        Self {
            primary: PrimaryModifier::Auto,
            enabled: true,
        }
    }
}

impl ShortcutConfig {
    #[must_use]
    pub fn with_primary(mut self, primary: PrimaryModifier) -> Self {
        self.primary = primary;
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Apply environment overrides on top of `self`.
    ///
    /// Unparseable values are ignored.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("ALBUMCARD_PRIMARY_MODIFIER")
            && let Ok(primary) = val.parse()
        {
            self.primary = primary;
        }
        if let Ok(val) = std::env::var("ALBUMCARD_DISABLE_SHORTCUTS") {
            self.enabled = !(val == "1" || val.eq_ignore_ascii_case("true"));
        }
        self
    }

    /// Load config from environment variables over the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }
}

/// High-level action produced by a key chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShortcutAction {
    Undo,
    Redo,
}

/// Stateless chord → action mapper.
#[derive(Debug, Clone)]
pub struct ShortcutMapper {
    config: ShortcutConfig,
    primary: Modifiers,
}

impl Default for ShortcutMapper {
    fn default() -> Self {
        Self::new(ShortcutConfig::default())
    }
}

impl ShortcutMapper {
    #[must_use]
    pub fn new(config: ShortcutConfig) -> Self {
        let primary = config.primary.resolve();
        Self { config, primary }
    }

    #[must_use]
    pub fn config(&self) -> &ShortcutConfig {
        &self.config
    }

    /// Map a key event delivered while `focus` holds keyboard focus.
    #[must_use]
    pub fn map(&self, event: &KeyEvent, focus: FocusTarget) -> Option<ShortcutAction> {
        if !self.config.enabled || focus.is_text_editable() {
            return None;
        }
        if event.kind == KeyEventKind::Release {
            return None;
        }
        if !event.modifiers.contains(self.primary) || event.alt() {
            return None;
        }
        if !event.is_char_ignore_case('z') {
            return None;
        }
        if event.shift() {
            Some(ShortcutAction::Redo)
        } else {
            Some(ShortcutAction::Undo)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::KeyCode;

    fn ctrl_mapper() -> ShortcutMapper {
        ShortcutMapper::new(ShortcutConfig::default().with_primary(PrimaryModifier::Ctrl))
    }

    fn key(c: char, mods: Modifiers) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c)).with_modifiers(mods)
    }

    #[test]
    fn primary_z_is_undo() {
        let mapper = ctrl_mapper();
        assert_eq!(
            mapper.map(&key('z', Modifiers::CTRL), FocusTarget::None),
            Some(ShortcutAction::Undo)
        );
    }

    #[test]
    fn primary_shift_z_is_redo_in_either_case() {
        let mapper = ctrl_mapper();
        let mods = Modifiers::CTRL | Modifiers::SHIFT;
        assert_eq!(
            mapper.map(&key('z', mods), FocusTarget::Control),
            Some(ShortcutAction::Redo)
        );
        assert_eq!(
            mapper.map(&key('Z', mods), FocusTarget::Control),
            Some(ShortcutAction::Redo)
        );
    }

    #[test]
    fn text_focus_suppresses_chords() {
        let mapper = ctrl_mapper();
        for focus in [
            FocusTarget::TextInput,
            FocusTarget::TextArea,
            FocusTarget::ContentEditable,
        ] {
            assert_eq!(mapper.map(&key('z', Modifiers::CTRL), focus), None);
        }
    }

    #[test]
    fn missing_primary_or_extra_alt_does_not_map() {
        let mapper = ctrl_mapper();
        assert_eq!(mapper.map(&key('z', Modifiers::NONE), FocusTarget::None), None);
        assert_eq!(mapper.map(&key('z', Modifiers::SUPER), FocusTarget::None), None);
        assert_eq!(
            mapper.map(&key('z', Modifiers::CTRL | Modifiers::ALT), FocusTarget::None),
            None
        );
        assert_eq!(mapper.map(&key('y', Modifiers::CTRL), FocusTarget::None), None);
    }

    #[test]
    fn release_events_do_not_map_but_repeats_do() {
        let mapper = ctrl_mapper();
        let release = key('z', Modifiers::CTRL).with_kind(KeyEventKind::Release);
        let repeat = key('z', Modifiers::CTRL).with_kind(KeyEventKind::Repeat);
        assert_eq!(mapper.map(&release, FocusTarget::None), None);
        assert_eq!(mapper.map(&repeat, FocusTarget::None), Some(ShortcutAction::Undo));
    }

    #[test]
    fn super_primary_ignores_ctrl() {
        let mapper =
            ShortcutMapper::new(ShortcutConfig::default().with_primary(PrimaryModifier::Super));
        assert_eq!(mapper.map(&key('z', Modifiers::CTRL), FocusTarget::None), None);
        assert_eq!(
            mapper.map(&key('z', Modifiers::SUPER), FocusTarget::None),
            Some(ShortcutAction::Undo)
        );
    }

    #[test]
    fn disabled_config_never_maps() {
        let mapper = ShortcutMapper::new(
            ShortcutConfig::default()
                .with_primary(PrimaryModifier::Ctrl)
                .disabled(),
        );
        assert_eq!(mapper.map(&key('z', Modifiers::CTRL), FocusTarget::None), None);
    }

    #[test]
    fn primary_modifier_parses_aliases() {
        assert_eq!("CTRL".parse(), Ok(PrimaryModifier::Ctrl));
        assert_eq!("cmd".parse(), Ok(PrimaryModifier::Super));
        assert_eq!(" auto ".parse(), Ok(PrimaryModifier::Auto));
        assert!("hyper".parse::<PrimaryModifier>().is_err());
    }
}
