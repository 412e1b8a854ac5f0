use super::*;
use axum::{body, body::Body, http::Request};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    events: broadcast::Receiver<ThemeEvent>,
    _dir: tempfile::TempDir,
}

async fn test_app_with_limit(max_upload_bytes: usize) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let api = ApiContext::new(storage, dir.path().join("exports"));
    let (events, rx) = broadcast::channel(32);
    let router = build_router(Arc::new(AppState { api, events }), max_upload_bytes);
    TestApp {
        router,
        events: rx,
        _dir: dir,
    }
}

async fn test_app() -> TestApp {
    test_app_with_limit(1024 * 1024).await
}

fn json_request(method: &str, uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request")
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn multipart_request(uri: &str, field: &str, content: &[u8]) -> Request<Body> {
    let boundary = "theme-boundary";
    let mut payload = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"wallpaper.png\"\r\nContent-Type: image/png\r\n\r\n"
    )
    .into_bytes();
    payload.extend_from_slice(content);
    payload.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    Request::post(uri)
        .header("content-type", format!("multipart/form-data; boundary={boundary}"))
        .header("content-length", payload.len())
        .body(Body::from(payload))
        .expect("request")
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn create(app: &TestApp) -> i64 {
    let (status, view) = send(app, json_request("POST", "/themes", json!({ "name": "night" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    view["theme_id"].as_i64().expect("theme id")
}

#[tokio::test]
async fn healthz_reports_ok_when_storage_is_ready() {
    let app = test_app().await;
    let response = app
        .router
        .clone()
        .oneshot(empty_request("GET", "/healthz"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn created_theme_is_listed_and_readable() {
    let app = test_app().await;
    let id = create(&app).await;

    let (status, listed) = send(&app, empty_request("GET", "/themes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let (status, view) = send(&app, empty_request("GET", &format!("/themes/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["version"], 1);
    assert_eq!(view["has_preview"], false);

    let (status, err) = send(&app, empty_request("GET", "/themes/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["code"], "not_found");
}

#[tokio::test]
async fn patch_route_broadcasts_theme_update() {
    let mut app = test_app().await;
    let id = create(&app).await;

    let (status, view) = send(
        &app,
        json_request(
            "POST",
            &format!("/themes/{id}/patch"),
            json!({
                "operations": [
                    { "op": "replace", "path": "/homeLayer/backgroundColor", "value": "#000000" }
                ],
                "user_prompt": "darker"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["theme"]["homeLayer"]["backgroundColor"], "#000000");

    match app.events.try_recv().expect("event") {
        ThemeEvent::ThemeUpdated { version, .. } => assert_eq!(version, 2),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn preview_commit_flow_over_http() {
    let app = test_app().await;
    let id = create(&app).await;

    let (status, _) = send(&app, empty_request("POST", &format!("/themes/{id}/preview/commit"))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, view) = send(
        &app,
        json_request(
            "POST",
            &format!("/themes/{id}/preview"),
            json!({
                "source": "patch",
                "operations": [
                    { "op": "replace", "path": "/homeLayer/backgroundColor", "value": "#334455" }
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["has_preview"], true);
    assert_eq!(view["display_theme"]["homeLayer"]["backgroundColor"], "#334455");

    let (status, view) = send(&app, empty_request("POST", &format!("/themes/{id}/preview/commit"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["theme"]["homeLayer"]["backgroundColor"], "#334455");
    assert_eq!(view["version"], 2);
}

#[tokio::test]
async fn image_upload_rejects_undecodable_bytes() {
    let app = test_app().await;
    let id = create(&app).await;

    let (status, err) = send(
        &app,
        multipart_request(&format!("/themes/{id}/palette/image"), "image", b"not a png"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "validation");

    let (status, _) = send(
        &app,
        multipart_request(&format!("/themes/{id}/palette/image"), "image", b""),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let app = test_app_with_limit(64).await;
    let id = create(&app).await;

    let (status, _) = send(
        &app,
        multipart_request(&format!("/themes/{id}/palette/image"), "image", &[0u8; 512]),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn element_routes_serve_seeded_catalog() {
    let mut app = test_app().await;
    let (status, seeded) = send(&app, empty_request("POST", "/elements/seed")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(seeded["count"], 19);

    let (status, home) = send(&app, empty_request("GET", "/elements?screen=home&customizable=true")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(home
        .as_array()
        .expect("array")
        .iter()
        .all(|el| el["screen"] == "home" && el["customizable"] == true));

    let (status, _) = send(&app, empty_request("GET", "/elements/search?q=")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, stats) = send(&app, empty_request("GET", "/elements/mapping-stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["mapped"], 15);

    let (status, _) = send(
        &app,
        json_request(
            "PUT",
            "/elements/action-buy/path",
            json!({ "json_path": "/homeLayer/actionButtons/buyButton/containerColor" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(matches!(
        app.events.try_recv(),
        Ok(ThemeEvent::ElementPathUpdated { .. })
    ));

    let (status, context) = send(&app, empty_request("GET", "/elements/action-buy/context")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(context["path_type"], "component");
}

#[tokio::test]
async fn preset_seed_route_is_idempotent() {
    let app = test_app().await;
    let (status, first) = send(&app, empty_request("POST", "/presets/seed")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(first["inserted"].as_u64().expect("inserted") > 0);

    let (_, second) = send(&app, empty_request("POST", "/presets/seed")).await;
    assert_eq!(second["inserted"], 0);

    let (status, presets) = send(&app, empty_request("GET", "/presets")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(presets.as_array().map(Vec::len), first["count"].as_u64().map(|c| c as usize));
}
