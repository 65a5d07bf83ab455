#![forbid(unsafe_code)]

//! Album Card Studio core: settings values, card defaults, and key input.
//!
//! # Role in Album Card Studio
//! `albumcard-core` holds the plain data the editor passes around: the
//! [`Configuration`] record and its values, the built-in card style, and the
//! keyboard types used to route undo/redo chords. It has no state machine of
//! its own; `albumcard-runtime` builds the settings store on top of it.

pub mod card;
pub mod event;
pub mod keybinding;
pub mod settings;

pub use event::{FocusTarget, KeyCode, KeyEvent, KeyEventKind, Modifiers};
pub use keybinding::{PrimaryModifier, ShortcutAction, ShortcutConfig, ShortcutMapper};
pub use settings::{
    Configuration, Overlay, OverlayIssue, Rgb, SettingKey, SettingValue, SettingsError,
    SettingsPatch, ValueKind,
};
