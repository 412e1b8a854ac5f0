use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use json_patch::PatchOperation;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{Palette, PresetId, ThemeId, ThemePatch, WalletElement, WalletTarget},
    error::ApiError,
};

/// Snapshot of a live theme session as returned by the theme routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeView {
    pub theme_id: ThemeId,
    pub name: String,
    pub version: i64,
    pub theme: Value,
    pub display_theme: Value,
    pub has_preview: bool,
    pub can_undo: bool,
    pub can_redo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_patch: Option<ThemePatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateThemeRequest {
    pub name: String,
    #[serde(default)]
    pub base_theme: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchRequest {
    pub operations: Vec<PatchOperation>,
    #[serde(default)]
    pub user_prompt: String,
    #[serde(default)]
    pub page_id: String,
    #[serde(default)]
    pub preset_id: Option<PresetId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PreviewRequest {
    Patch { operations: Vec<PatchOperation> },
    Preset { preset_id: PresetId },
    Palette { palette: Palette },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    Full,
    #[default]
    Targeted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateValueRequest {
    pub path: String,
    pub value: Value,
    #[serde(default)]
    pub mode: ApplyMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetThemeRequest {
    pub theme: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub theme: Value,
    pub wallet_target: WalletTarget,
    pub exported_at: DateTime<Utc>,
    pub theme_id: ThemeId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub path: String,
    pub theme_id: ThemeId,
    pub wallet_target: WalletTarget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaletteResponse {
    pub palette: Palette,
    pub patch: Vec<PatchOperation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedResponse {
    pub count: usize,
    pub inserted: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementFilter {
    #[serde(default)]
    pub screen: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub customizable: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenCounts {
    pub total: usize,
    pub customizable: usize,
    pub by_type: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenGroup {
    pub screen: String,
    pub elements: Vec<WalletElement>,
    pub counts: ScreenCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenElements {
    pub screen: String,
    pub elements: Vec<WalletElement>,
    pub by_position: BTreeMap<String, Vec<WalletElement>>,
    pub count: usize,
    pub customizable_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementStatistics {
    pub total: usize,
    pub customizable: usize,
    pub customization_percentage: u32,
    pub screens: BTreeMap<String, ScreenCounts>,
    pub types: BTreeMap<String, usize>,
    pub positions: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenCoverage {
    pub total: usize,
    pub mapped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingStats {
    pub total: usize,
    pub mapped: usize,
    pub unmapped: usize,
    pub coverage_percent: u32,
    pub by_screen: BTreeMap<String, ScreenCoverage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateElementPathRequest {
    pub json_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ThemeEvent {
    ThemeUpdated {
        theme_id: ThemeId,
        version: i64,
        theme: Value,
        /// Set for targeted updates; absent means the whole theme should be re-applied.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        updated_path: Option<String>,
    },
    PreviewChanged {
        theme_id: ThemeId,
        has_preview: bool,
    },
    PresetsSeeded {
        count: usize,
    },
    ElementPathUpdated {
        element_id: String,
        json_path: String,
    },
    Error(ApiError),
}
