use chrono::{DateTime, Utc};
use json_patch::PatchOperation;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(ThemeId);
id_newtype!(PresetId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WalletTarget {
    Phantom,
    Metamask,
    #[default]
    Demo,
}

impl WalletTarget {
    /// Reads `meta.walletTarget` from a theme document, defaulting to `Demo`.
    pub fn from_theme(theme: &Value) -> Self {
        match theme
            .pointer("/meta/walletTarget")
            .and_then(Value::as_str)
        {
            Some("phantom") => Self::Phantom,
            Some("metamask") => Self::Metamask,
            _ => Self::Demo,
        }
    }
}

/// Six-slot color palette used to recolor a theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub bg: String,
    pub fg: String,
    pub primary: String,
    pub accent1: String,
    pub accent2: String,
    pub neutral: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            bg: "#0E1016".into(),
            fg: "#FFFFFF".into(),
            primary: "#7C3AED".into(),
            accent1: "#22D3EE".into(),
            accent2: "#10B981".into(),
            neutral: "#1A1F2B".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeRecord {
    pub theme_id: ThemeId,
    pub name: String,
    pub base_theme: Value,
    pub current_theme: Value,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetRecord {
    pub preset_id: PresetId,
    pub title: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    pub sample_patch: Vec<PatchOperation>,
    pub sample_context: String,
    pub palette: Palette,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletElement {
    pub id: String,
    pub screen: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub customizable: bool,
    #[serde(default)]
    pub custom_props: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_path: Option<String>,
}

/// One entry of a theme's edit history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemePatch {
    pub id: Uuid,
    pub operations: Vec<PatchOperation>,
    pub user_prompt: String,
    pub page_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<PresetId>,
    pub timestamp: DateTime<Utc>,
    /// Theme state after this patch was applied.
    #[serde(default)]
    pub theme: Value,
}

impl ThemePatch {
    pub fn new(
        operations: Vec<PatchOperation>,
        user_prompt: impl Into<String>,
        page_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            operations,
            user_prompt: user_prompt.into(),
            page_id: page_id.into(),
            preset_id: None,
            timestamp: Utc::now(),
            theme: Value::Null,
        }
    }

    pub fn with_preset(mut self, preset_id: PresetId) -> Self {
        self.preset_id = Some(preset_id);
        self
    }
}

/// Preset row before it has been assigned an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPreset {
    pub title: String,
    pub tags: Vec<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    pub sample_patch: Vec<PatchOperation>,
    pub sample_context: String,
    pub palette: Palette,
}
