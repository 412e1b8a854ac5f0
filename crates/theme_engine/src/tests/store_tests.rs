use super::*;
use crate::patch::replace_op;
use serde_json::json;

fn base() -> Value {
    json!({
        "homeLayer": { "backgroundColor": "#000000", "textColor": "#ffffff" },
        "lockLayer": { "backgroundColor": "#101010" }
    })
}

fn recolor(path: &str, color: &str) -> Vec<PatchOperation> {
    vec![replace_op(path, json!(color)).expect("op")]
}

#[test]
fn preview_does_not_touch_committed_theme() {
    let mut store = ThemeStore::new(base());
    store
        .apply_preview_patch(recolor("/homeLayer/backgroundColor", "#ff0000"))
        .expect("preview");

    assert!(store.has_preview());
    assert_eq!(store.theme()["homeLayer"]["backgroundColor"], "#000000");
    assert_eq!(store.display_theme()["homeLayer"]["backgroundColor"], "#ff0000");
}

#[test]
fn commit_folds_preview_into_theme() {
    let mut store = ThemeStore::new(base());
    store
        .apply_preview_preset(PresetId(4), recolor("/lockLayer/backgroundColor", "#00ff00"))
        .expect("preview");
    let display = store.display_theme().clone();

    let entry = store.commit_preview().expect("commit");
    assert_eq!(entry.preset_id, Some(PresetId(4)));
    assert!(!store.has_preview());
    assert_eq!(store.theme(), &display);
    assert!(store.can_undo());
}

#[test]
fn commit_without_preview_is_an_error() {
    let mut store = ThemeStore::new(base());
    let err = store.commit_preview().expect_err("no preview");
    assert_eq!(err, ThemeError::NoPreview);
    assert_eq!(store.last_error(), Some("no preview to commit"));
    assert_eq!(store.theme(), &base());
}

#[test]
fn failing_preview_keeps_previous_state() {
    let mut store = ThemeStore::new(base());
    store
        .apply_preview_patch(recolor("/homeLayer/textColor", "#eeeeee"))
        .expect("first preview");

    let err = store
        .apply_preview_patch(recolor("/missing/textColor", "#eeeeee"))
        .expect_err("bad preview");
    assert!(matches!(err, ThemeError::Patch(_)));
    assert!(store.last_error().is_some());
    assert_eq!(store.display_theme()["homeLayer"]["textColor"], "#eeeeee");
    assert_eq!(store.theme(), &base());
}

#[test]
fn clear_preview_restores_display_theme() {
    let mut store = ThemeStore::new(base());
    store
        .apply_preview_patch(recolor("/homeLayer/textColor", "#eeeeee"))
        .expect("preview");
    store.clear_preview();
    assert_eq!(store.display_theme(), &base());
}

#[test]
fn set_theme_skips_identical_theme_and_rebases_preview() {
    let mut store = ThemeStore::new(base());
    assert!(!store.set_theme(base()));

    store
        .apply_preview_patch(recolor("/homeLayer/textColor", "#eeeeee"))
        .expect("preview");
    let mut next = base();
    next["homeLayer"]["backgroundColor"] = json!("#333333");
    assert!(store.set_theme(next));
    assert_eq!(store.display_theme()["homeLayer"]["backgroundColor"], "#333333");
    assert_eq!(store.display_theme()["homeLayer"]["textColor"], "#eeeeee");

    assert!(store.set_theme(json!({ "other": true })));
    assert!(!store.has_preview());
}

#[test]
fn undo_and_redo_walk_history() {
    let mut store = ThemeStore::new(base());
    assert!(!store.undo());

    store
        .apply_patch(ThemePatch::new(
            recolor("/homeLayer/backgroundColor", "#111111"),
            "darker",
            "home",
        ))
        .expect("first");
    store
        .apply_patch(ThemePatch::new(
            recolor("/homeLayer/backgroundColor", "#222222"),
            "lighter",
            "home",
        ))
        .expect("second");
    assert_eq!(store.current_patch().map(|p| p.user_prompt.as_str()), Some("lighter"));

    assert!(store.undo());
    assert_eq!(store.theme()["homeLayer"]["backgroundColor"], "#111111");
    assert!(store.undo());
    assert_eq!(store.theme(), &base());
    assert!(store.current_patch().is_none());
    assert!(!store.can_undo());

    assert!(store.redo());
    assert!(store.redo());
    assert!(!store.redo());
    assert_eq!(store.theme()["homeLayer"]["backgroundColor"], "#222222");
}

#[test]
fn new_patch_discards_redo_tail() {
    let mut store = ThemeStore::new(base());
    for color in ["#111111", "#222222"] {
        store
            .apply_patch(ThemePatch::new(
                recolor("/homeLayer/backgroundColor", color),
                color,
                "home",
            ))
            .expect("patch");
    }
    store.undo();
    store
        .apply_patch(ThemePatch::new(
            recolor("/lockLayer/backgroundColor", "#abcdef"),
            "lock",
            "lock",
        ))
        .expect("patch");
    assert!(!store.can_redo());
    assert_eq!(store.history().len(), 2);
}

#[test]
fn update_value_creates_missing_objects() {
    let mut store = ThemeStore::new(base());
    let entry = store
        .update_value("sendLayer/footer/textColor", json!("#123456"))
        .expect("update")
        .clone();
    assert_eq!(store.theme()["sendLayer"]["footer"]["textColor"], "#123456");
    assert_eq!(apply_patch(&base(), &entry.operations).expect("replay"), entry.theme);

    store.clear_history();
    assert!(!store.can_undo());
    assert_eq!(store.theme()["sendLayer"]["footer"]["textColor"], "#123456");
}

#[test]
fn update_value_entry_replays_over_scalar_parent() {
    let mut store = ThemeStore::new(json!({ "x": 5 }));
    let entry = store.update_value("/x/y", json!(1)).expect("update").clone();
    assert_eq!(entry.theme, json!({ "x": { "y": 1 } }));
    assert_eq!(
        apply_patch(&json!({ "x": 5 }), &entry.operations).expect("replay"),
        entry.theme
    );

    let mut empty = ThemeStore::new(json!({}));
    let entry = empty.update_value("/x/y", json!(1)).expect("update").clone();
    assert_eq!(
        apply_patch(&json!({}), &entry.operations).expect("replay"),
        json!({ "x": { "y": 1 } })
    );
}

#[test]
fn set_theme_is_recorded_in_history() {
    let mut store = ThemeStore::new(json!({ "a": 1 }));
    assert!(store.set_theme(json!({ "a": 2 })));
    store
        .apply_patch(ThemePatch::new(
            vec![crate::patch::add_op("/b", json!(true)).expect("op")],
            "add b",
            "home",
        ))
        .expect("patch");

    assert!(store.undo());
    assert_eq!(store.theme(), &json!({ "a": 2 }));
    assert!(store.undo());
    assert_eq!(store.theme(), &json!({ "a": 1 }));
    assert!(store.redo());
    assert_eq!(store.theme(), &json!({ "a": 2 }));
    assert_eq!(store.current_patch().map(|p| p.user_prompt.as_str()), Some("replace theme"));
}

#[test]
fn history_is_capped() {
    let mut store = ThemeStore::new(json!({ "n": 0 }));
    for n in 1..=MAX_HISTORY + 5 {
        store.update_value("/n", json!(n)).expect("update");
    }
    assert_eq!(store.history().len(), MAX_HISTORY);
    while store.undo() {}
    assert_eq!(store.theme(), &json!({ "n": 5 }));
}

#[test]
fn theme_id_round_trips() {
    let mut store = ThemeStore::new(base()).with_theme_id(ThemeId(9));
    assert_eq!(store.active_theme_id(), Some(ThemeId(9)));
    store.set_active_theme_id(None);
    assert_eq!(store.active_theme_id(), None);
}
