use super::*;
use serde_json::json;

fn theme() -> Value {
    json!({
        "homeLayer": {
            "backgroundColor": "#1C1C1C",
            "fontFamily": "Inter",
            "header": { "textColor": "#FFFFFF", "fontSize": "14px" },
            "actionButtons": { "containerColor": "#AB9FF2", "radius": 12 }
        },
        "global": { "textColor": "#EEEEEE" }
    })
}

fn surface() -> BindingSurface {
    BindingSurface::from_json(
        r#"{
            "home-background": { "background-color": "/homeLayer/backgroundColor" },
            "header-title": {
                "color": "/homeLayer/header/textColor",
                "font-size": "/homeLayer/header/fontSize"
            },
            "action-send": {
                "background-color": "/homeLayer/actionButtons/containerColor",
                "color": "/global/textColor"
            },
            "home-label": {},
            "lock-title": { "color": "/global/textColor" }
        }"#,
    )
    .expect("bindings")
}

#[test]
fn signals_only_visual_values() {
    assert_eq!(
        generate_signal("/a/textColor", &json!("#fff")),
        Some(json!("rgb(1, 2, 3)"))
    );
    assert_eq!(
        generate_signal("/a/shadow", &json!("rgba(0,0,0,0.2)")),
        Some(json!("rgb(1, 2, 3)"))
    );
    assert_eq!(generate_signal("/a/fontSize", &json!("14px")), Some(json!("999px")));
    assert_eq!(generate_signal("/a/fontSize", &json!("large")), None);
    assert_eq!(generate_signal("/a/borderRadius", &json!(12)), Some(json!(22)));
    assert_eq!(generate_signal("/a/opacity", &json!(0.5)), Some(json!(10.5)));
    assert_eq!(generate_signal("/a/count", &json!(3)), None);
    assert_eq!(generate_signal("/a/fontFamily", &json!("Inter")), None);
    assert_eq!(generate_signal("/a/visible", &json!(true)), None);
}

#[tokio::test]
async fn binding_surface_filters_by_prefix() {
    let ids = surface()
        .element_ids(&["lock-".to_string()])
        .await
        .expect("ids");
    assert_eq!(ids, vec!["lock-title"]);
}

#[tokio::test]
async fn maps_elements_to_driving_paths() {
    let probe = ThemeProbe::new(surface(), theme());
    let result = probe
        .build_mapping(&ProbeOptions::for_screen("home"))
        .await
        .expect("mapping");

    let item = |id: &str| {
        result
            .items
            .iter()
            .find(|i| i.id == id)
            .unwrap_or_else(|| panic!("missing {id}"))
    };

    let background = item("home-background");
    assert_eq!(background.status, ProbeStatus::Ok);
    assert_eq!(background.best_path.as_deref(), Some("/homeLayer/backgroundColor"));
    assert_eq!(background.confidence, 1.0);
    assert_eq!(background.changed_props, vec!["background-color"]);

    // color (weight 2) vs font-size (weight 1)
    let header = item("header-title");
    assert_eq!(header.status, ProbeStatus::Ok);
    assert_eq!(header.best_path.as_deref(), Some("/homeLayer/header/textColor"));
    assert!((header.confidence - 2.0 / 3.0).abs() < 1e-9);

    // two paths of equal weight
    let send = item("action-send");
    assert_eq!(send.status, ProbeStatus::Ambiguous);
    assert_eq!(send.candidates.len(), 2);
    assert_eq!(send.confidence, 0.5);

    assert_eq!(item("home-label").status, ProbeStatus::Unmapped);
    assert!(result.items.iter().all(|i| i.id != "lock-title"));

    assert_eq!(result.totals.ok, 2);
    assert_eq!(result.totals.ambiguous, 1);
    assert_eq!(result.totals.unmapped, 1);
    assert_eq!(result.coverage, 0.5);
}

#[tokio::test]
async fn empty_surface_gives_empty_result() {
    let probe = ThemeProbe::new(BindingSurface::default(), theme());
    let result = probe
        .build_mapping(&ProbeOptions::for_screen("lock"))
        .await
        .expect("mapping");
    assert_eq!(result, ProbeResult::default());
}

#[tokio::test]
async fn renders_reports() {
    let probe = ThemeProbe::new(surface(), theme());
    let result = probe
        .build_mapping(&ProbeOptions::for_screen("home"))
        .await
        .expect("mapping");

    let autogen = result.autogen("home", "2024-01-01T00:00:00Z");
    assert_eq!(autogen["items"].as_array().map(Vec::len), Some(2));
    assert_eq!(autogen["items"][0]["status"], "OK");

    let report = result.report("home", "2024-01-01T00:00:00Z");
    assert_eq!(report["totals"]["AMBIGUOUS"], 1);
    assert_eq!(report["items"].as_array().map(Vec::len), Some(4));

    let summary = result.summary_markdown("home", "2024-01-01T00:00:00Z");
    assert!(summary.starts_with("# ThemeProbe Mapping Summary: home"));
    assert!(summary.contains("- **Coverage**: 50.0%"));
    assert!(summary.contains("| AMBIGUOUS | 1 |"));
    assert!(summary.contains("| home-label | UNMAPPED | 0.0% | N/A |"));
}
