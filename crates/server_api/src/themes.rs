//! Theme session operations. Every change to a committed theme is persisted
//! with a version bump before it is reported back.

use chrono::Utc;
use json_patch::PatchOperation;
use serde_json::Value;
use shared::{
    domain::{Palette, ThemeId, ThemePatch, ThemeRecord, WalletTarget},
    error::ApiError,
    protocol::{
        ApplyMode, CreateThemeRequest, ExportPayload, ExportResponse, PaletteResponse,
        PatchRequest, PreviewRequest, SetThemeRequest, ThemeEvent, ThemeView,
        UpdateValueRequest,
    },
};
use storage::Storage;
use theme_engine::{
    analyzer::{analyze_theme_structure, CategoryGroup},
    generate::{generate_patch_from_palette, DEFAULT_SAFE_PREFIXES},
    palette::{extract_palette, sanitize_palette},
    patch::normalize_pointer,
    vision::vision_patch,
    ThemeStore,
};
use tracing::{info, warn};

use crate::{internal, theme_error, ApiContext, Session};

/// Result of a theme operation: the session after the change and, when
/// something observable happened, the event to broadcast.
#[derive(Debug, Clone)]
pub struct ThemeOutcome {
    pub view: ThemeView,
    pub event: Option<ThemeEvent>,
}

/// Stores the committed theme. On failure the session is put back to
/// `before` so memory never runs ahead of the database.
async fn persist(
    storage: &Storage,
    theme_id: ThemeId,
    session: &mut Session,
    before: ThemeStore,
    updated_path: Option<String>,
) -> Result<ThemeEvent, ApiError> {
    let theme = session.store.theme().clone();
    match storage.update_current_theme(theme_id, &theme).await {
        Ok(version) => session.version = version,
        Err(err) => {
            warn!(theme_id = theme_id.0, "theme not stored, session rolled back");
            session.store = before;
            return Err(internal(err));
        }
    }
    info!(theme_id = theme_id.0, version = session.version, "theme committed");
    Ok(ThemeEvent::ThemeUpdated {
        theme_id,
        version: session.version,
        theme,
        updated_path,
    })
}

fn committed(session: &Session, theme_id: ThemeId, event: ThemeEvent) -> ThemeOutcome {
    ThemeOutcome {
        view: session.view(theme_id),
        event: Some(event),
    }
}

fn preview_changed(session: &Session, theme_id: ThemeId) -> ThemeOutcome {
    ThemeOutcome {
        view: session.view(theme_id),
        event: Some(ThemeEvent::PreviewChanged {
            theme_id,
            has_preview: session.store.has_preview(),
        }),
    }
}

pub async fn create_theme(ctx: &ApiContext, req: CreateThemeRequest) -> Result<ThemeView, ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("theme name must not be empty"));
    }
    let base = match req.base_theme {
        Some(theme @ Value::Object(_)) => theme,
        Some(_) => return Err(ApiError::validation("base theme must be a JSON object")),
        None => theme_engine::default_theme(),
    };
    let record = ctx
        .storage
        .create_theme(name, &base)
        .await
        .map_err(internal)?;
    info!(theme_id = record.theme_id.0, name = %record.name, "theme created");

    let handle = ctx.session(record.theme_id).await?;
    let session = handle.lock().await;
    Ok(session.view(record.theme_id))
}

pub async fn list_themes(ctx: &ApiContext) -> Result<Vec<ThemeRecord>, ApiError> {
    ctx.storage.list_themes().await.map_err(internal)
}

pub async fn get_theme(ctx: &ApiContext, theme_id: ThemeId) -> Result<ThemeView, ApiError> {
    let handle = ctx.session(theme_id).await?;
    let session = handle.lock().await;
    Ok(session.view(theme_id))
}

pub async fn set_theme(
    ctx: &ApiContext,
    theme_id: ThemeId,
    req: SetThemeRequest,
) -> Result<ThemeOutcome, ApiError> {
    if !req.theme.is_object() {
        return Err(ApiError::validation("theme must be a JSON object"));
    }
    let handle = ctx.session(theme_id).await?;
    let mut session = handle.lock().await;
    let before = session.store.clone();
    if !session.store.set_theme(req.theme) {
        return Ok(ThemeOutcome {
            view: session.view(theme_id),
            event: None,
        });
    }
    let event = persist(&ctx.storage, theme_id, &mut session, before, None).await?;
    Ok(committed(&session, theme_id, event))
}

pub async fn apply_patch(
    ctx: &ApiContext,
    theme_id: ThemeId,
    req: PatchRequest,
) -> Result<ThemeOutcome, ApiError> {
    let mut patch = ThemePatch::new(req.operations, req.user_prompt, req.page_id);
    patch.preset_id = req.preset_id;

    let handle = ctx.session(theme_id).await?;
    let mut session = handle.lock().await;
    let before = session.store.clone();
    session.store.apply_patch(patch).map_err(theme_error)?;
    let event = persist(&ctx.storage, theme_id, &mut session, before, None).await?;
    Ok(committed(&session, theme_id, event))
}

/// Patch that recolors `theme` with `palette` inside the editable layers.
fn palette_operations(palette: &Palette, theme: &Value) -> Result<Vec<PatchOperation>, ApiError> {
    generate_patch_from_palette(palette, theme, DEFAULT_SAFE_PREFIXES).map_err(theme_error)
}

pub async fn preview(
    ctx: &ApiContext,
    theme_id: ThemeId,
    req: PreviewRequest,
) -> Result<ThemeOutcome, ApiError> {
    // Presets are looked up before the session lock is taken.
    let preset = match &req {
        PreviewRequest::Preset { preset_id } => Some(
            ctx.storage
                .load_preset(*preset_id)
                .await
                .map_err(internal)?
                .ok_or_else(|| ApiError::not_found(format!("preset {} not found", preset_id.0)))?,
        ),
        _ => None,
    };

    let handle = ctx.session(theme_id).await?;
    let mut session = handle.lock().await;
    let result = match req {
        PreviewRequest::Patch { operations } => session.store.apply_preview_patch(operations),
        PreviewRequest::Palette { palette } => {
            let palette = sanitize_palette(&palette);
            let operations = palette_operations(&palette, session.store.theme())?;
            session.store.apply_preview_patch(operations)
        }
        PreviewRequest::Preset { preset_id } => {
            let preset = preset
                .ok_or_else(|| ApiError::not_found(format!("preset {} not found", preset_id.0)))?;
            session
                .store
                .apply_preview_preset(preset.preset_id, preset.sample_patch)
        }
    };
    result.map_err(theme_error)?;
    Ok(preview_changed(&session, theme_id))
}

pub async fn commit_preview(ctx: &ApiContext, theme_id: ThemeId) -> Result<ThemeOutcome, ApiError> {
    let handle = ctx.session(theme_id).await?;
    let mut session = handle.lock().await;
    let before = session.store.clone();
    session.store.commit_preview().map_err(theme_error)?;
    let event = persist(&ctx.storage, theme_id, &mut session, before, None).await?;
    Ok(committed(&session, theme_id, event))
}

pub async fn clear_preview(ctx: &ApiContext, theme_id: ThemeId) -> Result<ThemeOutcome, ApiError> {
    let handle = ctx.session(theme_id).await?;
    let mut session = handle.lock().await;
    session.store.clear_preview();
    Ok(preview_changed(&session, theme_id))
}

pub async fn undo(ctx: &ApiContext, theme_id: ThemeId) -> Result<ThemeOutcome, ApiError> {
    step_history(ctx, theme_id, true).await
}

pub async fn redo(ctx: &ApiContext, theme_id: ThemeId) -> Result<ThemeOutcome, ApiError> {
    step_history(ctx, theme_id, false).await
}

async fn step_history(
    ctx: &ApiContext,
    theme_id: ThemeId,
    backwards: bool,
) -> Result<ThemeOutcome, ApiError> {
    let handle = ctx.session(theme_id).await?;
    let mut session = handle.lock().await;
    let before = session.store.clone();
    let moved = if backwards {
        session.store.undo()
    } else {
        session.store.redo()
    };
    if !moved {
        return Ok(ThemeOutcome {
            view: session.view(theme_id),
            event: None,
        });
    }
    let event = persist(&ctx.storage, theme_id, &mut session, before, None).await?;
    Ok(committed(&session, theme_id, event))
}

pub async fn update_value(
    ctx: &ApiContext,
    theme_id: ThemeId,
    req: UpdateValueRequest,
) -> Result<ThemeOutcome, ApiError> {
    let pointer = normalize_pointer(&req.path);
    let handle = ctx.session(theme_id).await?;
    let mut session = handle.lock().await;
    let before = session.store.clone();
    session
        .store
        .update_value(&pointer, req.value)
        .map_err(theme_error)?;
    let updated_path = match req.mode {
        ApplyMode::Targeted => Some(pointer),
        ApplyMode::Full => None,
    };
    let event = persist(&ctx.storage, theme_id, &mut session, before, updated_path).await?;
    Ok(committed(&session, theme_id, event))
}

/// Writes the committed theme to `<export_dir>/<theme_id>.json`.
pub async fn export_theme(ctx: &ApiContext, theme_id: ThemeId) -> Result<ExportResponse, ApiError> {
    let payload = {
        let handle = ctx.session(theme_id).await?;
        let session = handle.lock().await;
        let theme = session.store.theme().clone();
        ExportPayload {
            wallet_target: WalletTarget::from_theme(&theme),
            theme,
            exported_at: Utc::now(),
            theme_id,
            name: session.name.clone(),
        }
    };

    let body = serde_json::to_vec_pretty(&payload).map_err(|e| internal(e.into()))?;
    tokio::fs::create_dir_all(&ctx.export_dir)
        .await
        .map_err(|e| internal(e.into()))?;
    let path = ctx.export_dir.join(format!("{}.json", theme_id.0));
    tokio::fs::write(&path, body)
        .await
        .map_err(|e| internal(e.into()))?;
    info!(theme_id = theme_id.0, path = %path.display(), "theme exported");

    Ok(ExportResponse {
        path: path.display().to_string(),
        theme_id,
        wallet_target: payload.wallet_target,
    })
}

/// Patch recoloring the committed theme with `palette`. Nothing is applied.
pub async fn palette_patch(
    ctx: &ApiContext,
    theme_id: ThemeId,
    palette: Palette,
) -> Result<PaletteResponse, ApiError> {
    let palette = sanitize_palette(&palette);
    let handle = ctx.session(theme_id).await?;
    let session = handle.lock().await;
    let patch = palette_operations(&palette, session.store.theme())?;
    Ok(PaletteResponse { palette, patch })
}

/// Palette of an uploaded image and the whitelisted patch it would apply.
pub async fn palette_from_image(
    ctx: &ApiContext,
    theme_id: ThemeId,
    image: &[u8],
) -> Result<PaletteResponse, ApiError> {
    let image = image.to_vec();
    let palette = tokio::task::spawn_blocking(move || extract_palette(&image))
        .await
        .map_err(|err| internal(err.into()))?
        .map_err(|err| ApiError::validation(err.to_string()))?;
    let palette = sanitize_palette(&palette);

    let handle = ctx.session(theme_id).await?;
    let session = handle.lock().await;
    let patch = vision_patch(&palette, session.store.theme()).map_err(theme_error)?;
    info!(theme_id = theme_id.0, ops = patch.len(), "palette extracted from image");
    Ok(PaletteResponse { palette, patch })
}

pub async fn analyze(ctx: &ApiContext, theme_id: ThemeId) -> Result<Vec<CategoryGroup>, ApiError> {
    let handle = ctx.session(theme_id).await?;
    let session = handle.lock().await;
    Ok(analyze_theme_structure(session.store.display_theme()))
}

#[cfg(test)]
#[path = "tests/themes_tests.rs"]
mod tests;
