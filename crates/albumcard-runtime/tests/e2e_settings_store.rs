#![forbid(unsafe_code)]

//! End-to-end scenarios for the settings store.
//!
//! Drives a store over the album card defaults the way the editor does:
//! discrete toggles, slider drags, keyboard undo/redo, and the host loop
//! ticking persistence with a manual clock.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use albumcard_core::card::{self, QrContentMode, keys};
use albumcard_core::{
    Configuration, FocusTarget, KeyCode, KeyEvent, Modifiers, PrimaryModifier, Rgb,
    SettingValue, SettingsError, SettingsPatch, ShortcutConfig,
};
use albumcard_runtime::{
    KeyListenerHub, ManualClock, MemoryStorage, SettingsStore, StoreConfig, UndoShortcuts,
};

// ============================================================================
// Fixtures
// ============================================================================

/// Bridge that records every persisted snapshot.
#[derive(Clone, Default)]
struct RecordingBridge {
    writes: Rc<RefCell<Vec<Configuration>>>,
}

impl RecordingBridge {
    fn writes(&self) -> Vec<Configuration> {
        self.writes.borrow().clone()
    }
}

struct Harness {
    store: SettingsStore,
    clock: ManualClock,
    bridge: RecordingBridge,
}

fn harness_with(config: StoreConfig) -> Harness {
    let clock = ManualClock::new();
    let bridge = RecordingBridge::default();
    let sink = bridge.clone();
    let store = SettingsStore::builder(card::defaults())
        .config(config)
        .clock(clock.clone())
        .bridge(move |configuration: &Configuration| {
            sink.writes.borrow_mut().push(configuration.clone());
        })
        .build();
    Harness {
        store,
        clock,
        bridge,
    }
}

fn harness() -> Harness {
    harness_with(StoreConfig::default())
}

// ============================================================================
// Undo / redo
// ============================================================================

#[test]
fn first_set_enables_undo_and_undo_restores_initial() {
    let h = harness();
    let initial = h.store.current();
    assert!(!h.store.can_undo());

    h.store.set(keys::SHOW_QR, false).unwrap();
    assert!(h.store.can_undo());
    h.store.set(keys::THEME, "dark").unwrap();
    h.store.set(keys::BACKGROUND_COLOR, Rgb::new(0x20, 0x20, 0x20)).unwrap();

    while h.store.undo() {}
    assert_eq!(*h.store.current(), *initial);
    assert!(!h.store.can_undo());
    assert_eq!(h.store.future_depth(), 3);
}

#[test]
fn redo_after_undo_restores_exact_snapshot() {
    let h = harness();
    h.store.set(keys::TRACKLIST_COLUMNS, 3).unwrap();
    h.store.set(keys::QR_CONTENT_MODE, QrContentMode::Discogs).unwrap();
    let x = h.store.current();

    assert!(h.store.undo());
    assert_ne!(*h.store.current(), *x);
    assert!(h.store.redo());
    assert!(Arc::ptr_eq(&h.store.current(), &x));
    assert!(!h.store.can_redo());
}

#[test]
fn discrete_edit_after_undo_clears_future() {
    let h = harness();
    h.store.set(keys::SHOW_COVER, false).unwrap();
    h.store.set(keys::SHOW_ARTIST, false).unwrap();
    h.store.undo();
    h.store.undo();
    assert_eq!(h.store.future_depth(), 2);

    h.store.set(keys::FONT_SCALE, 1.25).unwrap();
    assert!(!h.store.can_redo());
    assert!(h.store.future().is_empty());
}

#[test]
fn apply_settings_and_reset_clear_future() {
    let h = harness();
    h.store.set(keys::SHOW_COVER, false).unwrap();
    h.store.undo();
    h.store
        .apply_settings(&SettingsPatch::new().with(keys::THEME, "dark").with(keys::FONT_SCALE, 0.9))
        .unwrap();
    assert!(!h.store.can_redo());

    h.store.undo();
    assert!(h.store.can_redo());
    h.store.reset();
    assert!(!h.store.can_redo());
}

#[test]
fn rejected_patch_applies_nothing() {
    let h = harness();
    let patch = SettingsPatch::new()
        .with(keys::THEME, "dark")
        .with("mirrorBack", true);
    assert!(h.store.apply_settings(&patch).is_err());
    assert_eq!(h.store.current().get_text(keys::THEME), Some("light"));
    assert_eq!(h.store.version(), 0);
}

// ============================================================================
// Live sessions
// ============================================================================

#[test]
fn drag_collapses_to_one_step_equal_to_pre_drag_config() {
    let h = harness();
    h.store.set(keys::THEME, "dark").unwrap();
    let before_drag = h.store.current();
    let past_before = h.store.past_depth();

    for i in 1..=50 {
        h.store
            .set_live(keys::CORNER_RADIUS_MM, 3.0 + f64::from(i) * 0.1)
            .unwrap();
    }
    assert!(h.store.commit_live());

    assert_eq!(h.store.past_depth(), past_before + 1);
    let last = h.store.past().pop().unwrap();
    assert!(Arc::ptr_eq(&last, &before_drag));
    assert!(h.store.undo());
    assert_eq!(*h.store.current(), *before_drag);
}

#[test]
fn compound_gesture_across_keys_is_one_step() {
    let h = harness();
    h.store.set_live(keys::CARD_WIDTH_MM, 70.0).unwrap();
    h.store.set_live(keys::CARD_HEIGHT_MM, 95.0).unwrap();
    h.store.set_live(keys::CARD_WIDTH_MM, 72.0).unwrap();
    h.store.commit_live();
    assert_eq!(h.store.past_depth(), 1);

    h.store.undo();
    assert_eq!(*h.store.current(), card::defaults());
}

#[test]
fn color_picker_drag_with_hex_strings_is_one_step() {
    let h = harness();
    h.store.set(keys::ACCENT_COLOR, "#00FF00").unwrap();
    assert_eq!(h.store.current().get_color(keys::ACCENT_COLOR), Some(Rgb::new(0, 255, 0)));
    let before_drag = h.store.current();

    for hex in ["#ff0000", "#ee1111", "#dd2222", "#CC3333"] {
        h.store.set_live(keys::BACKGROUND_COLOR, hex).unwrap();
    }
    assert!(h.store.commit_live());
    assert_eq!(
        h.store.current().get_color(keys::BACKGROUND_COLOR),
        Some(Rgb::new(0xcc, 0x33, 0x33))
    );
    assert_eq!(h.store.past_depth(), 2);

    assert!(h.store.undo());
    assert_eq!(*h.store.current(), *before_drag);
}

#[test]
fn malformed_hex_is_rejected_without_a_step() {
    let h = harness();
    let err = h.store.set_live(keys::BACKGROUND_COLOR, "#12345").unwrap_err();
    assert_eq!(err, SettingsError::InvalidColor("#12345".into()));
    assert!(h.store.set(keys::TEXT_COLOR, "teal").is_err());
    assert!(!h.store.is_live());
    assert!(!h.store.can_undo());
    assert_eq!(h.store.version(), 0);
}

#[test]
fn set_live_with_equal_value_is_a_no_op() {
    let h = harness();
    let version = h.store.version();
    h.store.set_live(keys::QR_SIZE_MM, 18.0).unwrap();
    h.store.set_live(keys::QR_SIZE_MM, 18).unwrap();
    assert_eq!(h.store.version(), version);
    assert!(!h.store.is_live());
    assert!(!h.store.persist_pending());
    assert!(!h.store.commit_live());
    assert_eq!(h.store.past_depth(), 0);
}

#[test]
fn commit_without_change_leaves_past_alone() {
    let h = harness();
    h.store.set(keys::SHOW_QR, false).unwrap();
    let past = h.store.past();
    assert!(!h.store.commit_live());
    assert!(!h.store.commit_live());
    assert_eq!(h.store.past(), past);
}

#[test]
fn net_zero_drag_still_commits_a_step() {
    let h = harness();
    h.store.set_live(keys::FONT_SCALE, 1.3).unwrap();
    h.store.set_live(keys::FONT_SCALE, 1.0).unwrap();
    assert!(h.store.live_dirty());
    assert!(h.store.commit_live());
    assert_eq!(h.store.past_depth(), 1);
}

#[test]
fn undo_during_live_session_abandons_it() {
    let h = harness();
    h.store.set(keys::SHOW_TRACKLIST, false).unwrap();
    h.store.set_live(keys::FONT_SCALE, 1.4).unwrap();
    h.store.set_live(keys::FONT_SCALE, 1.5).unwrap();

    assert!(h.store.undo());
    assert!(!h.store.is_live());
    assert!(!h.store.commit_live());
    assert_eq!(h.store.past_depth(), 0);
    assert_eq!(*h.store.current(), card::defaults());
}

#[test]
fn undo_with_empty_past_keeps_live_session() {
    let h = harness();
    h.store.set_live(keys::FONT_SCALE, 1.4).unwrap();
    assert!(!h.store.undo());
    assert!(h.store.is_live());
    assert!(h.store.commit_live());
    assert_eq!(h.store.past_depth(), 1);
}

// ============================================================================
// History bounds
// ============================================================================

#[test]
fn depth_three_keeps_most_recent_three() {
    let h = harness_with(StoreConfig::default().with_history_depth(3));
    let mut seen = vec![h.store.current()];
    for scale in [1.1, 1.2, 1.3, 1.4] {
        h.store.set(keys::FONT_SCALE, scale).unwrap();
        seen.push(h.store.current());
    }
    // seen = [A, B, C, D, E]; current is E.
    let past = h.store.past();
    assert_eq!(past.len(), 3);
    for (kept, expected) in past.iter().zip(&seen[1..4]) {
        assert!(Arc::ptr_eq(kept, expected));
    }
}

#[test]
fn future_is_bounded_too() {
    let h = harness_with(StoreConfig::default().with_history_depth(2));
    for cols in 1..=2 {
        h.store.set(keys::TRACKLIST_COLUMNS, cols).unwrap();
    }
    while h.store.undo() {}
    assert_eq!(h.store.future_depth(), 2);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn burst_of_edits_persists_once_with_final_value() {
    let h = harness();
    for i in 0..10 {
        h.store.set(keys::TRACKLIST_COLUMNS, i % 4 + 1).unwrap();
        h.clock.advance_ms(20);
        assert!(!h.store.tick());
    }
    // Last edit at t=180ms, so the write is due at t=380ms.
    h.clock.advance_ms(179);
    assert!(!h.store.tick());
    h.clock.advance_ms(1);
    assert!(h.store.tick());

    let writes = h.bridge.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0], *h.store.current());
    assert_eq!(
        writes[0].get(keys::TRACKLIST_COLUMNS),
        Some(&SettingValue::Integer(2))
    );
}

#[test]
fn live_edits_and_undo_also_persist() {
    let h = harness();
    h.store.set_live(keys::FONT_SCALE, 1.2).unwrap();
    h.clock.advance_ms(500);
    h.store.tick();
    h.store.commit_live();
    h.store.undo();
    h.clock.advance_ms(500);
    h.store.tick();

    let writes = h.bridge.writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].get_number(keys::FONT_SCALE), Some(1.2));
    assert_eq!(writes[1], card::defaults());
}

#[test]
fn teardown_cancels_pending_write() {
    let h = harness();
    h.store.set(keys::SHOW_QR, false).unwrap();
    h.store.teardown();
    h.clock.advance_ms(1_000);
    assert!(!h.store.tick());
    assert!(h.bridge.writes().is_empty());
    assert_eq!(h.store.persist_stats().cancelled, 1);
}

#[test]
fn dropping_last_handle_cancels_pending_write() {
    let h = harness();
    h.store.set(keys::SHOW_QR, false).unwrap();
    let Harness { store, clock, bridge } = h;
    drop(store);
    clock.advance_ms(1_000);
    assert!(bridge.writes().is_empty());
}

#[test]
fn flush_writes_immediately() {
    let h = harness();
    h.store.set(keys::QR_CUSTOM_TEXT, "side A").unwrap();
    assert!(h.store.flush());
    assert!(!h.store.flush());
    assert_eq!(h.bridge.writes().len(), 1);
    h.clock.advance_ms(1_000);
    assert!(!h.store.tick());
}

#[test]
fn storage_round_trip_restores_settings() {
    let storage = MemoryStorage::new();
    let clock = ManualClock::new();

    let first = SettingsStore::builder(card::defaults())
        .clock(clock.clone())
        .bridge(albumcard_runtime::StoragePersistence::new(storage.clone()))
        .build();
    first.set(keys::ACCENT_COLOR, Rgb::new(0xff, 0x55, 0x00)).unwrap();
    first.set(keys::QR_CONTENT_MODE, QrContentMode::AppleMusic).unwrap();
    assert!(first.flush());
    first.teardown();

    let second = SettingsStore::with_storage(card::defaults(), storage, StoreConfig::default());
    let current = second.current();
    assert_eq!(current.get_color(keys::ACCENT_COLOR), Some(Rgb::new(0xff, 0x55, 0x00)));
    assert_eq!(
        QrContentMode::from_configuration(&current),
        QrContentMode::AppleMusic
    );
    assert!(!second.can_undo());
}

// ============================================================================
// Keyboard routing
// ============================================================================

#[test]
fn keyboard_undo_redo_round_trip() {
    let h = harness();
    let hub = KeyListenerHub::new();
    let _shortcuts = UndoShortcuts::mount(
        &hub,
        h.store.clone(),
        ShortcutConfig::default().with_primary(PrimaryModifier::Super),
    );
    h.store.set(keys::THEME, "dark").unwrap();

    let undo = KeyEvent::new(KeyCode::Char('z')).with_modifiers(Modifiers::SUPER);
    let redo = KeyEvent::new(KeyCode::Char('z')).with_modifiers(Modifiers::SUPER | Modifiers::SHIFT);

    // Typing in the custom QR text field keeps native undo.
    assert!(!hub.dispatch(&undo, FocusTarget::TextInput).default_prevented);
    assert_eq!(h.store.current().get_text(keys::THEME), Some("dark"));

    assert!(hub.dispatch(&undo, FocusTarget::None).default_prevented);
    assert_eq!(h.store.current().get_text(keys::THEME), Some("light"));
    assert!(hub.dispatch(&redo, FocusTarget::None).default_prevented);
    assert_eq!(h.store.current().get_text(keys::THEME), Some("dark"));

    // Wrong modifier for this configuration.
    let ctrl = KeyEvent::new(KeyCode::Char('z')).with_modifiers(Modifiers::CTRL);
    assert_eq!(hub.dispatch(&ctrl, FocusTarget::None).handled, 0);
}

#[test]
fn subscribers_render_every_published_snapshot() {
    let h = harness();
    let rendered = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&rendered);
    let sub = h.store.subscribe(move |snapshot| {
        sink.borrow_mut().push(snapshot.get_bool(keys::SHOW_QR));
    });

    h.store.set(keys::SHOW_QR, false).unwrap();
    h.store.undo();
    drop(sub);
    h.store.redo();

    assert_eq!(*rendered.borrow(), vec![Some(false), Some(true)]);
}

#[test]
fn subscriber_can_write_back_into_store() {
    let h = harness();
    let writer = h.store.clone();
    // Keep the QR size legible whenever the QR is shown.
    let _sub = h.store.subscribe(move |snapshot| {
        if snapshot.get_bool(keys::SHOW_QR) == Some(true)
            && snapshot.get_number(keys::QR_SIZE_MM).is_some_and(|mm| mm < 12.0)
        {
            writer.set(keys::QR_SIZE_MM, 12.0).unwrap();
        }
    });

    h.store.set(keys::QR_SIZE_MM, 8.0).unwrap();
    assert_eq!(h.store.current().get_number(keys::QR_SIZE_MM), Some(12.0));
    assert_eq!(h.store.past_depth(), 2);
}
