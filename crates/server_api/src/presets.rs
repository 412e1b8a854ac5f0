use shared::{
    domain::{NewPreset, PresetId, PresetRecord},
    error::ApiError,
    protocol::{SeedResponse, ThemeEvent},
};
use theme_engine::preset::{builtin_presets, validate_presets};
use tracing::info;

use crate::{internal, theme_error, ApiContext};

pub async fn list_presets(ctx: &ApiContext) -> Result<Vec<PresetRecord>, ApiError> {
    ctx.storage.list_presets().await.map_err(internal)
}

pub async fn get_preset(ctx: &ApiContext, preset_id: PresetId) -> Result<PresetRecord, ApiError> {
    ctx.storage
        .load_preset(preset_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found(format!("preset {} not found", preset_id.0)))
}

/// Builds the built-in catalog against the default theme, validates it and
/// inserts the presets not stored yet.
pub async fn seed_presets(ctx: &ApiContext) -> Result<(SeedResponse, ThemeEvent), ApiError> {
    let presets = builtin_presets(&theme_engine::default_theme()).map_err(theme_error)?;
    validate_presets(&presets).map_err(|err| ApiError::validation(err.to_string()))?;

    let count = presets.len();
    let mut inserted = 0;
    for preset in presets {
        let preset = NewPreset::from(preset);
        if ctx
            .storage
            .insert_preset(&preset)
            .await
            .map_err(internal)?
            .is_some()
        {
            inserted += 1;
        }
    }
    info!(count, inserted, "presets seeded");
    Ok((SeedResponse { count, inserted }, ThemeEvent::PresetsSeeded { count: inserted }))
}

#[cfg(test)]
#[path = "tests/presets_tests.rs"]
mod tests;
