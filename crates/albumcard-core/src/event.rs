#![forbid(unsafe_code)]

//! Keyboard event types delivered by the host window.
//!
//! The editor only routes keyboard chords, so this module models key events
//! and where keyboard focus currently sits. Everything derives `Clone`,
//! `PartialEq`, and `Eq` for use in tests and pattern matching.
//!
//! # Design Notes
//!
//! - `KeyEventKind` defaults to `Press` when the host cannot tell
//! - `Modifiers` use bitflags for easy combination
//! - Character keys carry the produced character, so Shift+z may arrive as
//!   either `'z'` or `'Z'` depending on the host

use bitflags::bitflags;

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key code that was pressed.
    pub code: KeyCode,

    /// Modifier keys held during the event.
    pub modifiers: Modifiers,

    /// The type of key event (press, repeat, or release).
    pub kind: KeyEventKind,
}

impl KeyEvent {
    /// Create a new key event with default modifiers and Press kind.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
            kind: KeyEventKind::Press,
        }
    }

    /// Create a key event with modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Create a key event with a specific kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: KeyEventKind) -> Self {
        self.kind = kind;
        self
    }

    /// Check if this is a specific character key, ignoring ASCII case.
    #[must_use]
    pub fn is_char_ignore_case(&self, c: char) -> bool {
        matches!(self.code, KeyCode::Char(ch) if ch.eq_ignore_ascii_case(&c))
    }

    /// Check if Ctrl modifier is held.
    #[must_use]
    pub const fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }

    /// Check if Alt modifier is held.
    #[must_use]
    pub const fn alt(&self) -> bool {
        self.modifiers.contains(Modifiers::ALT)
    }

    /// Check if Shift modifier is held.
    #[must_use]
    pub const fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }

    /// Check if Super/Meta/Cmd modifier is held.
    #[must_use]
    pub const fn super_key(&self) -> bool {
        self.modifiers.contains(Modifiers::SUPER)
    }
}

/// Key codes for keyboard events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A regular character key.
    Char(char),
    Enter,
    Escape,
    Backspace,
    Tab,
    Delete,
    Up,
    Down,
    Left,
    Right,
}

/// The type of key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventKind {
    /// Key was pressed (default when not distinguishable).
    #[default]
    Press,

    /// Key is being held (repeat event).
    Repeat,

    /// Key was released.
    Release,
}

bitflags! {
    /// Modifier keys that can be held during a key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b0000;
        /// Shift key.
        const SHIFT = 0b0001;
        /// Alt/Option key.
        const ALT   = 0b0010;
        /// Control key.
        const CTRL  = 0b0100;
        /// Super/Meta/Command key.
        const SUPER = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

/// Where keyboard focus sits when a key event is delivered.
///
/// Free-text targets own their native text undo, so global shortcuts must
/// leave them alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FocusTarget {
    /// Nothing in particular has focus (document body).
    #[default]
    None,
    /// A single-line text input.
    TextInput,
    /// A multi-line textarea.
    TextArea,
    /// A rich-text / content-editable region.
    ContentEditable,
    /// A non-text control (button, slider, select, color swatch).
    Control,
}

impl FocusTarget {
    /// Whether the focused element edits free text.
    #[must_use]
    pub const fn is_text_editable(self) -> bool {
        matches!(
            self,
            Self::TextInput | Self::TextArea | Self::ContentEditable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_event_defaults_to_press_without_modifiers() {
        let event = KeyEvent::new(KeyCode::Char('z'));
        assert_eq!(event.kind, KeyEventKind::Press);
        assert_eq!(event.modifiers, Modifiers::NONE);
        assert!(!event.ctrl());
        assert!(!event.shift());
    }

    #[test]
    fn modifier_helpers_reflect_flags() {
        let event = KeyEvent::new(KeyCode::Char('z'))
            .with_modifiers(Modifiers::CTRL | Modifiers::SHIFT);
        assert!(event.ctrl());
        assert!(event.shift());
        assert!(!event.alt());
        assert!(!event.super_key());
    }

    #[test]
    fn char_match_ignores_case() {
        assert!(KeyEvent::new(KeyCode::Char('Z')).is_char_ignore_case('z'));
        assert!(KeyEvent::new(KeyCode::Char('z')).is_char_ignore_case('Z'));
        assert!(!KeyEvent::new(KeyCode::Char('y')).is_char_ignore_case('z'));
        assert!(!KeyEvent::new(KeyCode::Enter).is_char_ignore_case('z'));
    }

    #[test]
    fn text_targets_are_editable() {
        assert!(FocusTarget::TextInput.is_text_editable());
        assert!(FocusTarget::TextArea.is_text_editable());
        assert!(FocusTarget::ContentEditable.is_text_editable());
        assert!(!FocusTarget::Control.is_text_editable());
        assert!(!FocusTarget::None.is_text_editable());
    }
}
