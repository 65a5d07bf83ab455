#![forbid(unsafe_code)]

//! Property tests for [`Configuration`] edits and JSON overlays.
//!
//! Validates:
//! - A patch with any invalid entry changes nothing.
//! - Valid edits never change the key set.
//! - Overlaying arbitrary JSON objects always yields a complete record.

use albumcard_core::card::{self, keys};
use albumcard_core::{Configuration, SettingValue, SettingsPatch};
use proptest::prelude::*;
use serde_json::{Value, json};

fn scale_strategy() -> impl Strategy<Value = f64> {
    (1u32..400).prop_map(|v| f64::from(v) / 100.0)
}

fn json_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|v| json!(v)),
        scale_strategy().prop_map(|v| json!(v)),
        "[a-z#0-9]{0,8}".prop_map(Value::String),
        Just(Value::Null),
    ]
}

fn key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => prop::sample::select(card::defaults().keys().map(|k| k.to_string()).collect::<Vec<_>>()),
        1 => "[a-z]{3,10}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn invalid_entry_poisons_whole_patch(scale in scale_strategy(), columns in 1i64..6) {
        let base = card::defaults();
        let patch = SettingsPatch::new()
            .with(keys::FONT_SCALE, scale)
            .with(keys::TRACKLIST_COLUMNS, columns)
            .with(keys::SHOW_QR, "not a bool");
        prop_assert!(base.merged(&patch).is_err());
        prop_assert_eq!(base, card::defaults());
    }

    #[test]
    fn valid_edits_keep_key_set(scale in scale_strategy(), columns in 1i64..6, shown: bool) {
        let base = card::defaults();
        let next = base
            .merged(
                &SettingsPatch::new()
                    .with(keys::FONT_SCALE, scale)
                    .with(keys::TRACKLIST_COLUMNS, columns)
                    .with(keys::SHOW_TRACKLIST, shown),
            )
            .unwrap();
        prop_assert!(next.keys().eq(base.keys()));
        prop_assert_eq!(next.get_number(keys::FONT_SCALE), Some(scale));
        prop_assert!(matches!(next.get(keys::TRACKLIST_COLUMNS), Some(SettingValue::Integer(c)) if *c == columns));
        let changed = next.changed_keys(&base);
        prop_assert!(changed.len() <= 3);
    }

    #[test]
    fn overlay_is_always_complete(
        entries in prop::collection::btree_map(key_strategy(), json_scalar(), 0..12)
    ) {
        let defaults = card::defaults();
        let object: serde_json::Map<String, Value> = entries.into_iter().collect();
        let overlay = defaults.overlay_json(&Value::Object(object.clone()));

        prop_assert!(overlay.configuration.keys().eq(defaults.keys()));
        let applied = object.len() - overlay.issues.len();
        prop_assert!(overlay.configuration.changed_keys(&defaults).len() <= applied);
        for (key, value) in overlay.configuration.iter() {
            prop_assert_eq!(value.kind(), defaults.get(key.as_str()).unwrap().kind());
        }
    }

    #[test]
    fn json_of_configuration_overlays_to_itself(scale in scale_strategy(), theme in "[a-z]{1,8}") {
        let config: Configuration = card::defaults()
            .merged(&SettingsPatch::new().with(keys::FONT_SCALE, scale).with(keys::THEME, theme))
            .unwrap();
        let overlay = card::defaults().overlay_json(&config.to_json());
        prop_assert!(overlay.issues.is_empty());
        prop_assert_eq!(overlay.configuration, config);
    }
}
