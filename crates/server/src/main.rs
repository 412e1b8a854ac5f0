use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use server_api::{elements, presets, themes, themes::ThemeOutcome, ApiContext};
use shared::{
    domain::{Palette, PresetId, PresetRecord, ThemeId, ThemeRecord, WalletElement},
    error::{ApiError, ErrorCode},
    protocol::{
        CreateThemeRequest, ElementFilter, ElementStatistics, ExportResponse, MappingStats,
        PaletteResponse, PatchRequest, PreviewRequest, ScreenElements, ScreenGroup, SeedResponse,
        SetThemeRequest, ThemeEvent, ThemeView, UpdateElementPathRequest, UpdateValueRequest,
    },
};
use storage::Storage;
use theme_engine::{analyzer::CategoryGroup, elements::ElementContext};
use tokio::sync::broadcast;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, prepare_database_url};

#[derive(Clone)]
struct AppState {
    api: ApiContext,
    events: broadcast::Sender<ThemeEvent>,
}

impl AppState {
    fn publish(&self, event: ThemeEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn publish_outcome(&self, outcome: ThemeOutcome) -> ThemeView {
        if let Some(event) = outcome.event {
            self.publish(event);
        }
        outcome.view
    }
}

type HttpError = (StatusCode, Json<ApiError>);
type HttpResult<T> = Result<Json<T>, HttpError>;

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn http_error(err: ApiError) -> HttpError {
    (status_for(err.code), Json(err))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let api = ApiContext::new(storage, settings.export_dir.clone());

    if settings.seed_on_startup {
        seed_catalogs(&api).await;
    }

    let (events, _) = broadcast::channel(256);
    let state = AppState { api, events };
    let app = build_router(Arc::new(state), settings.max_upload_bytes);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, export_dir = %settings.export_dir.display(), "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Seeds the built-in presets and element catalog; failures are logged and
/// the server still starts.
async fn seed_catalogs(api: &ApiContext) {
    match presets::seed_presets(api).await {
        Ok((seeded, _)) => info!(count = seeded.count, inserted = seeded.inserted, "preset catalog ready"),
        Err(err) => warn!(message = %err.message, "preset seeding failed"),
    }
    match elements::seed_elements(api).await {
        Ok(seeded) => info!(count = seeded.count, "element catalog ready"),
        Err(err) => warn!(message = %err.message, "element seeding failed"),
    }
}

fn build_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/themes", get(http_list_themes).post(http_create_theme))
        .route("/themes/:theme_id", get(http_get_theme).put(http_set_theme))
        .route("/themes/:theme_id/patch", post(http_apply_patch))
        .route(
            "/themes/:theme_id/preview",
            post(http_preview).delete(http_clear_preview),
        )
        .route("/themes/:theme_id/preview/commit", post(http_commit_preview))
        .route("/themes/:theme_id/undo", post(http_undo))
        .route("/themes/:theme_id/redo", post(http_redo))
        .route("/themes/:theme_id/value", post(http_update_value))
        .route("/themes/:theme_id/export", post(http_export_theme))
        .route("/themes/:theme_id/palette", post(http_palette_patch))
        .route("/themes/:theme_id/palette/image", post(http_palette_from_image))
        .route("/themes/:theme_id/analysis", get(http_analyze))
        .route("/presets", get(http_list_presets))
        .route("/presets/seed", post(http_seed_presets))
        .route("/presets/:preset_id", get(http_get_preset))
        .route("/elements", get(http_list_elements))
        .route("/elements/seed", post(http_seed_elements))
        .route("/elements/grouped", get(http_grouped_elements))
        .route("/elements/screens/:screen", get(http_screen_elements))
        .route("/elements/customizable", get(http_customizable_elements))
        .route("/elements/statistics", get(http_element_statistics))
        .route("/elements/search", get(http_search_elements))
        .route("/elements/mapped", get(http_mapped_elements))
        .route("/elements/mapping-stats", get(http_mapping_stats))
        .route("/elements/context", get(http_element_context_text))
        .route("/elements/:element_id/context", get(http_element_context))
        .route("/elements/:element_id/path", put(http_update_element_path))
        .route("/ws", get(ws_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, HttpError> {
    state.api.storage.health_check().await.map_err(|e| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new(ErrorCode::Internal, e.to_string())),
        )
    })?;
    Ok("ok")
}

async fn http_list_themes(State(state): State<Arc<AppState>>) -> HttpResult<Vec<ThemeRecord>> {
    themes::list_themes(&state.api).await.map(Json).map_err(http_error)
}

async fn http_create_theme(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateThemeRequest>,
) -> Result<(StatusCode, Json<ThemeView>), HttpError> {
    let view = themes::create_theme(&state.api, req).await.map_err(http_error)?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn http_get_theme(
    State(state): State<Arc<AppState>>,
    Path(theme_id): Path<i64>,
) -> HttpResult<ThemeView> {
    themes::get_theme(&state.api, ThemeId(theme_id))
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_set_theme(
    State(state): State<Arc<AppState>>,
    Path(theme_id): Path<i64>,
    Json(req): Json<SetThemeRequest>,
) -> HttpResult<ThemeView> {
    let outcome = themes::set_theme(&state.api, ThemeId(theme_id), req)
        .await
        .map_err(http_error)?;
    Ok(Json(state.publish_outcome(outcome)))
}

async fn http_apply_patch(
    State(state): State<Arc<AppState>>,
    Path(theme_id): Path<i64>,
    Json(req): Json<PatchRequest>,
) -> HttpResult<ThemeView> {
    let outcome = themes::apply_patch(&state.api, ThemeId(theme_id), req)
        .await
        .map_err(http_error)?;
    Ok(Json(state.publish_outcome(outcome)))
}

async fn http_preview(
    State(state): State<Arc<AppState>>,
    Path(theme_id): Path<i64>,
    Json(req): Json<PreviewRequest>,
) -> HttpResult<ThemeView> {
    let outcome = themes::preview(&state.api, ThemeId(theme_id), req)
        .await
        .map_err(http_error)?;
    Ok(Json(state.publish_outcome(outcome)))
}

async fn http_commit_preview(
    State(state): State<Arc<AppState>>,
    Path(theme_id): Path<i64>,
) -> HttpResult<ThemeView> {
    let outcome = themes::commit_preview(&state.api, ThemeId(theme_id))
        .await
        .map_err(http_error)?;
    Ok(Json(state.publish_outcome(outcome)))
}

async fn http_clear_preview(
    State(state): State<Arc<AppState>>,
    Path(theme_id): Path<i64>,
) -> HttpResult<ThemeView> {
    let outcome = themes::clear_preview(&state.api, ThemeId(theme_id))
        .await
        .map_err(http_error)?;
    Ok(Json(state.publish_outcome(outcome)))
}

async fn http_undo(
    State(state): State<Arc<AppState>>,
    Path(theme_id): Path<i64>,
) -> HttpResult<ThemeView> {
    let outcome = themes::undo(&state.api, ThemeId(theme_id))
        .await
        .map_err(http_error)?;
    Ok(Json(state.publish_outcome(outcome)))
}

async fn http_redo(
    State(state): State<Arc<AppState>>,
    Path(theme_id): Path<i64>,
) -> HttpResult<ThemeView> {
    let outcome = themes::redo(&state.api, ThemeId(theme_id))
        .await
        .map_err(http_error)?;
    Ok(Json(state.publish_outcome(outcome)))
}

async fn http_update_value(
    State(state): State<Arc<AppState>>,
    Path(theme_id): Path<i64>,
    Json(req): Json<UpdateValueRequest>,
) -> HttpResult<ThemeView> {
    let outcome = themes::update_value(&state.api, ThemeId(theme_id), req)
        .await
        .map_err(http_error)?;
    Ok(Json(state.publish_outcome(outcome)))
}

async fn http_export_theme(
    State(state): State<Arc<AppState>>,
    Path(theme_id): Path<i64>,
) -> HttpResult<ExportResponse> {
    themes::export_theme(&state.api, ThemeId(theme_id))
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_palette_patch(
    State(state): State<Arc<AppState>>,
    Path(theme_id): Path<i64>,
    Json(palette): Json<Palette>,
) -> HttpResult<PaletteResponse> {
    themes::palette_patch(&state.api, ThemeId(theme_id), palette)
        .await
        .map(Json)
        .map_err(http_error)
}

/// Takes the `image` field of a multipart form, or the first field when none
/// is named that way.
async fn http_palette_from_image(
    State(state): State<Arc<AppState>>,
    Path(theme_id): Path<i64>,
    mut multipart: Multipart,
) -> HttpResult<PaletteResponse> {
    let bad_form = |err: MultipartError| (err.status(), Json(ApiError::validation(err.body_text())));

    let mut image = None;
    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let named_image = field.name() == Some("image");
        if image.is_some() && !named_image {
            continue;
        }
        let bytes = field.bytes().await.map_err(bad_form)?;
        image = Some(bytes);
        if named_image {
            break;
        }
    }

    let image = image
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| http_error(ApiError::validation("image upload cannot be empty")))?;
    themes::palette_from_image(&state.api, ThemeId(theme_id), &image)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_analyze(
    State(state): State<Arc<AppState>>,
    Path(theme_id): Path<i64>,
) -> HttpResult<Vec<CategoryGroup>> {
    themes::analyze(&state.api, ThemeId(theme_id))
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_list_presets(State(state): State<Arc<AppState>>) -> HttpResult<Vec<PresetRecord>> {
    presets::list_presets(&state.api).await.map(Json).map_err(http_error)
}

async fn http_get_preset(
    State(state): State<Arc<AppState>>,
    Path(preset_id): Path<i64>,
) -> HttpResult<PresetRecord> {
    presets::get_preset(&state.api, PresetId(preset_id))
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_seed_presets(State(state): State<Arc<AppState>>) -> HttpResult<SeedResponse> {
    let (seeded, event) = presets::seed_presets(&state.api).await.map_err(http_error)?;
    state.publish(event);
    Ok(Json(seeded))
}

async fn http_list_elements(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ElementFilter>,
) -> HttpResult<Vec<WalletElement>> {
    elements::list_elements(&state.api, &filter)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_seed_elements(State(state): State<Arc<AppState>>) -> HttpResult<SeedResponse> {
    elements::seed_elements(&state.api).await.map(Json).map_err(http_error)
}

async fn http_grouped_elements(State(state): State<Arc<AppState>>) -> HttpResult<Vec<ScreenGroup>> {
    elements::grouped_by_screen(&state.api)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_screen_elements(
    State(state): State<Arc<AppState>>,
    Path(screen): Path<String>,
) -> HttpResult<ScreenElements> {
    elements::by_screen(&state.api, &screen)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_customizable_elements(
    State(state): State<Arc<AppState>>,
) -> HttpResult<Vec<WalletElement>> {
    elements::customizable(&state.api).await.map(Json).map_err(http_error)
}

async fn http_element_statistics(
    State(state): State<Arc<AppState>>,
) -> HttpResult<ElementStatistics> {
    elements::statistics(&state.api).await.map(Json).map_err(http_error)
}

async fn http_search_elements(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SearchQuery>,
) -> HttpResult<Vec<WalletElement>> {
    elements::search(&state.api, &q.q)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_mapped_elements(State(state): State<Arc<AppState>>) -> HttpResult<Vec<WalletElement>> {
    elements::mapped(&state.api).await.map(Json).map_err(http_error)
}

async fn http_mapping_stats(State(state): State<Arc<AppState>>) -> HttpResult<MappingStats> {
    elements::mapping_stats(&state.api)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_element_context_text(
    State(state): State<Arc<AppState>>,
) -> Result<String, HttpError> {
    elements::context_text(&state.api).await.map_err(http_error)
}

async fn http_element_context(
    State(state): State<Arc<AppState>>,
    Path(element_id): Path<String>,
) -> HttpResult<ElementContext> {
    elements::element_context(&state.api, &element_id)
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_update_element_path(
    State(state): State<Arc<AppState>>,
    Path(element_id): Path<String>,
    Json(req): Json<UpdateElementPathRequest>,
) -> Result<StatusCode, HttpError> {
    let event = elements::update_path(&state.api, &element_id, &req.json_path)
        .await
        .map_err(http_error)?;
    state.publish(event);
    Ok(StatusCode::NO_CONTENT)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket))
}

async fn ws_connection(state: Arc<AppState>, socket: axum::extract::ws::WebSocket) {
    use axum::extract::ws::Message;
    use futures::{SinkExt, StreamExt};

    let (mut sender, mut receiver) = socket.split();
    let mut events_rx = state.events.subscribe();

    let send_task = tokio::spawn(async move {
        loop {
            let event = match events_rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "websocket subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let text = match serde_json::to_string(&event) {
                Ok(v) => v,
                Err(_) => continue,
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(_msg)) = receiver.next().await {}

    send_task.abort();
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
