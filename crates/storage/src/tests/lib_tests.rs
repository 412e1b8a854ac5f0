use super::*;
use serde_json::json;
use shared::domain::Palette;

async fn memory() -> Storage {
    Storage::new("sqlite::memory:").await.expect("db")
}

fn element(id: &str, screen: &str, position: Option<&str>, customizable: bool) -> WalletElement {
    WalletElement {
        id: id.into(),
        screen: screen.into(),
        name: id.replace('-', " "),
        kind: if id.contains("button") { "button" } else { "text" }.into(),
        description: format!("The {id} element"),
        customizable,
        custom_props: vec!["textColor".into()],
        position: position.map(Into::into),
        selector: Some(format!("[data-element-id=\"{id}\"]")),
        json_path: None,
    }
}

fn preset(title: &str) -> NewPreset {
    NewPreset {
        title: title.into(),
        tags: vec!["dark".into()],
        cover_url: None,
        sample_patch: serde_json::from_value(json!([
            { "op": "replace", "path": "/homeLayer/backgroundColor", "value": "#000000" }
        ]))
        .expect("patch"),
        sample_context: "moody".into(),
        palette: Palette::default(),
    }
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    memory().await.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("nested").join("themes.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[tokio::test]
async fn theme_updates_bump_version() {
    let storage = memory().await;
    let base = json!({ "homeLayer": { "backgroundColor": "#1C1C1C" } });
    let created = storage.create_theme("night", &base).await.expect("create");
    assert_eq!(created.version, 1);
    assert_eq!(created.current_theme, base);

    let next = json!({ "homeLayer": { "backgroundColor": "#000000" } });
    let version = storage
        .update_current_theme(created.theme_id, &next)
        .await
        .expect("update");
    assert_eq!(version, 2);

    let loaded = storage
        .load_theme(created.theme_id)
        .await
        .expect("load")
        .expect("present");
    assert_eq!(loaded.current_theme, next);
    assert_eq!(loaded.base_theme, base);
    assert_eq!(loaded.version, 2);

    assert_eq!(storage.list_themes().await.expect("list").len(), 1);
    assert!(storage.load_theme(ThemeId(999)).await.expect("load").is_none());
    assert!(storage
        .update_current_theme(ThemeId(999), &next)
        .await
        .is_err());
}

#[tokio::test]
async fn preset_insert_is_idempotent_on_title() {
    let storage = memory().await;
    let first = storage.insert_preset(&preset("Space")).await.expect("insert");
    let again = storage.insert_preset(&preset("Space")).await.expect("insert");
    assert!(first.is_some());
    assert!(again.is_none());

    let presets = storage.list_presets().await.expect("list");
    assert_eq!(presets.len(), 1);
    assert_eq!(presets[0].tags, vec!["dark"]);
    assert_eq!(presets[0].sample_patch.len(), 1);

    let id = first.expect("id");
    let loaded = storage.load_preset(id).await.expect("load").expect("present");
    assert_eq!(loaded.title, "Space");
    assert_eq!(loaded.palette, Palette::default());
}

#[tokio::test]
async fn blank_preset_titles_are_rejected() {
    let storage = memory().await;
    assert!(storage.insert_preset(&preset("   ")).await.is_err());
}

#[tokio::test]
async fn filters_and_orders_elements() {
    let storage = memory().await;
    storage
        .upsert_wallet_elements(&[
            element("home-footer", "home", Some("bottom"), true),
            element("unlock-button", "lock", Some("bottom"), true),
            element("home-balance", "home", Some("center"), true),
            element("home-badge", "home", Some("top"), false),
        ])
        .await
        .expect("seed");

    let home = storage
        .list_elements(&ElementFilter {
            screen: Some("home".into()),
            ..Default::default()
        })
        .await
        .expect("home");
    let ids: Vec<_> = home.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["home-footer", "home-balance", "home-badge"]);

    let fixed = storage
        .list_elements(&ElementFilter {
            customizable: Some(false),
            ..Default::default()
        })
        .await
        .expect("fixed");
    assert_eq!(fixed.len(), 1);

    let buttons = storage
        .list_elements(&ElementFilter {
            kind: Some("button".into()),
            ..Default::default()
        })
        .await
        .expect("buttons");
    assert_eq!(buttons[0].id, "unlock-button");
    assert_eq!(buttons[0].custom_props, vec!["textColor"]);
}

#[tokio::test]
async fn search_is_case_insensitive_and_skips_fixed_elements() {
    let storage = memory().await;
    storage
        .upsert_wallet_elements(&[
            element("home-balance", "home", None, true),
            element("home-badge", "home", None, false),
        ])
        .await
        .expect("seed");

    let found = storage.search_elements("HOME").await.expect("search");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "home-balance");
    assert!(storage.search_elements("nothing").await.expect("search").is_empty());
}

#[tokio::test]
async fn element_paths_survive_reseeding() {
    let storage = memory().await;
    let catalog = vec![element("home-balance", "home", None, true)];
    storage.upsert_wallet_elements(&catalog).await.expect("seed");

    assert!(storage
        .update_element_path("home-balance", "/homeLayer/totalBalanceValue/textColor")
        .await
        .expect("update"));
    assert!(!storage
        .update_element_path("missing", "/x")
        .await
        .expect("update"));

    storage.upsert_wallet_elements(&catalog).await.expect("reseed");
    let loaded = storage
        .load_element("home-balance")
        .await
        .expect("load")
        .expect("present");
    assert_eq!(
        loaded.json_path.as_deref(),
        Some("/homeLayer/totalBalanceValue/textColor")
    );
}
