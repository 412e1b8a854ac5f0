use std::{collections::HashSet, path::Path};

use json_patch::PatchOperation;
use serde::Deserialize;
use serde_json::Value;
use shared::domain::{NewPreset, Palette};
use thiserror::Error;

use crate::{
    generate::{generate_patch_from_palette, DEFAULT_SAFE_PREFIXES},
    palette::sanitize_palette,
    patch::{apply_patch, ThemeError},
};

/// Slugs of the built-in catalog, in seeding order.
pub const BUILTIN_SLUGS: &[&str] = &[
    "wolf",
    "cz",
    "superman",
    "snoopdogg",
    "pepe",
    "elonmusk",
    "gorillaz",
    "mia",
    "wifTheme",
    "guccicatluxurytheme",
    "luxuryTheme",
    "defaultTheme",
    "trump",
    "wcc",
    "simpsons",
    "space",
    "mexico",
    "china",
    "nirvana",
    "football",
];

/// Number of titles a curated preset list file must hold.
pub const EXPECTED_PRESET_LIST_LEN: usize = 12;

struct CatalogEntry {
    title: &'static str,
    tags: &'static [&'static str],
    context: &'static str,
    /// bg, fg, primary, accent1, accent2, neutral
    colors: [&'static str; 6],
}

fn catalog_entry(slug: &str) -> Option<CatalogEntry> {
    let entry = |title: &'static str,
                 tags: &'static [&'static str],
                 context: &'static str,
                 colors: [&'static str; 6]| CatalogEntry {
        title,
        tags,
        context,
        colors,
    };
    Some(match slug {
        "wolf" => entry(
            "Wolf of Wall Street",
            &["luxury", "finance", "dark", "gold"],
            "luxury finance aesthetic, black/gold color scheme, glossy accents, professional trading interface",
            ["#0B0B0B", "#F5E6B8", "#D4AF37", "#B8860B", "#2E7D32", "#1C1A14"],
        ),
        "cz" => entry(
            "CZ Minimalist",
            &["minimal", "tech", "blue", "clean"],
            "clean minimal tech aesthetic, cool blues, high contrast on CTAs, modern simplicity",
            ["#0A1220", "#FFFFFF", "#2F80ED", "#56CCF2", "#F0B90B", "#16213A"],
        ),
        "superman" => entry(
            "Superman",
            &["heroic", "comic", "red", "blue"],
            "heroic comic energy, red/blue highlights, bold headings, dynamic superhero styling",
            ["#0B1A3A", "#FFFFFF", "#D62828", "#FCBF49", "#1D4ED8", "#12275A"],
        ),
        "snoopdogg" => entry(
            "Snoop Dogg",
            &["urban", "neon", "purple", "chill"],
            "urban neon-chill vibes, purple accents, vibey gradients, west coast hip-hop styling",
            ["#140A22", "#F3E8FF", "#9D4EDD", "#22C55E", "#F72585", "#24153A"],
        ),
        "pepe" => entry(
            "Pepe",
            &["meme", "green", "playful"],
            "playful meme-inspired styling, green accents, fun gradients, internet culture vibes",
            ["#0F1A0F", "#FFFFFF", "#4CAF50", "#8BC34A", "#E53935", "#1B2A1B"],
        ),
        "elonmusk" => entry(
            "Elon Musk",
            &["tech", "space", "minimal", "futuristic"],
            "futuristic tech aesthetic, space-inspired colors, minimal design, innovation-focused styling",
            ["#05070D", "#E5E7EB", "#3B82F6", "#94A3B8", "#EF4444", "#111827"],
        ),
        "gorillaz" => entry(
            "Gorillaz",
            &["artistic", "colorful", "creative"],
            "artistic creative vibes, colorful palette, expressive design, alternative music aesthetic",
            ["#121212", "#FAFAFA", "#FF6B35", "#00B4D8", "#FFD166", "#232323"],
        ),
        "mia" => entry(
            "Mia",
            &["elegant", "minimal", "pink"],
            "elegant feminine aesthetic, soft pink tones, refined design, sophisticated styling",
            ["#1F1418", "#FFF1F5", "#F472B6", "#FBCFE8", "#C084FC", "#2D1D24"],
        ),
        "wifTheme" => entry(
            "WIF Theme",
            &["meme", "crypto", "dog"],
            "WIF-inspired crypto meme styling, playful dog theme, community-focused design",
            ["#1A120B", "#FFF7ED", "#F59E0B", "#F472B6", "#A16207", "#2A1E14"],
        ),
        "guccicatluxurytheme" => entry(
            "Gucci Cat Luxury",
            &["luxury", "fashion", "cat", "premium"],
            "luxury fashion aesthetic with cat motifs, premium styling, high-end fashion vibes",
            ["#0D1A12", "#F8F1E0", "#C9A227", "#B91C1C", "#166534", "#18281D"],
        ),
        "luxuryTheme" => entry(
            "Luxury Theme",
            &["luxury", "premium", "gold", "elegant"],
            "premium luxury styling, gold accents, elegant typography, high-end aesthetic",
            ["#101010", "#F5F0E1", "#CFB53B", "#E6C77A", "#8C7853", "#1E1B16"],
        ),
        "defaultTheme" => entry(
            "Default Theme",
            &["default", "balanced", "neutral"],
            "balanced default styling, neutral colors, versatile design suitable for all use cases",
            ["#1C1C1C", "#FFFFFF", "#AB9FF2", "#22D3EE", "#10B981", "#2A2A2A"],
        ),
        "trump" => entry(
            "TRUMP",
            &["patriotic", "bold", "american", "red"],
            "bold patriotic theme with red, white and blue American styling, presidential aesthetic",
            ["#0A1633", "#FFFFFF", "#B22234", "#3C3B6E", "#D4AF37", "#14224A"],
        ),
        "wcc" => entry(
            "WCC",
            &["custom", "community", "branded"],
            "West Coast Customs inspired styling, automotive culture, custom design aesthetic",
            ["#0E0E10", "#F4F4F5", "#E11D48", "#F97316", "#A1A1AA", "#1F1F23"],
        ),
        "simpsons" => entry(
            "Simpsons",
            &["cartoon", "yellow", "fun", "family"],
            "cartoon-inspired Simpsons styling, yellow color scheme, fun family-friendly design",
            ["#10233F", "#FFFFFF", "#FED90F", "#70D1FE", "#F14E28", "#1A3358"],
        ),
        "space" => entry(
            "Space",
            &["cosmic", "dark", "futuristic", "stars"],
            "cosmic space theme, dark starry backgrounds, futuristic elements, galaxy aesthetics",
            ["#05030F", "#E0E7FF", "#6366F1", "#A855F7", "#22D3EE", "#12102A"],
        ),
        "mexico" => entry(
            "Mexico",
            &["cultural", "vibrant", "traditional", "colorful"],
            "vibrant Mexican cultural styling, traditional colors, festive design elements",
            ["#13100C", "#FFFFFF", "#006847", "#CE1126", "#F4A261", "#251E16"],
        ),
        "china" => entry(
            "China",
            &["cultural", "red", "traditional", "elegant"],
            "traditional Chinese aesthetic, red and gold colors, elegant cultural elements",
            ["#1A0A0A", "#FFF5E1", "#DE2910", "#FFDE00", "#B8860B", "#2B1212"],
        ),
        "nirvana" => entry(
            "Nirvana",
            &["grunge", "alternative", "music", "dark"],
            "grunge alternative music aesthetic, dark moody styling, 90s music culture vibes",
            ["#0D0D0D", "#EDEDED", "#FFD400", "#4A90A4", "#8B8B8B", "#1A1A1A"],
        ),
        "football" => entry(
            "Football",
            &["sports", "green", "athletic", "competitive"],
            "football sports theme, green field colors, athletic competitive styling",
            ["#0B1F0E", "#FFFFFF", "#22C55E", "#FACC15", "#E5E7EB", "#14301A"],
        ),
        _ => return None,
    })
}

/// A preset ready to be validated and seeded.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetData {
    pub slug: String,
    pub title: String,
    pub tags: Vec<String>,
    pub cover_url: Option<String>,
    pub sample_patch: Vec<PatchOperation>,
    pub sample_context: String,
    pub palette: Palette,
}

impl PresetData {
    /// Looks `slug` up in the built-in catalog and derives its sample patch
    /// against `default_theme`. Unknown slugs become an untagged preset titled
    /// by the slug with the default palette.
    pub fn build(slug: &str, default_theme: &Value) -> Result<Self, ThemeError> {
        let (title, tags, sample_context, palette) = match catalog_entry(slug) {
            Some(entry) => {
                let [bg, fg, primary, accent1, accent2, neutral] = entry.colors.map(String::from);
                (
                    entry.title.to_string(),
                    entry.tags.iter().map(|t| t.to_string()).collect(),
                    entry.context.to_string(),
                    Palette {
                        bg,
                        fg,
                        primary,
                        accent1,
                        accent2,
                        neutral,
                    },
                )
            }
            None => (
                slug.to_string(),
                Vec::new(),
                format!("Style: {slug}"),
                Palette::default(),
            ),
        };
        let palette = sanitize_palette(&palette);
        let sample_patch =
            generate_patch_from_palette(&palette, default_theme, DEFAULT_SAFE_PREFIXES)?;

        Ok(Self {
            slug: slug.to_string(),
            title,
            tags,
            cover_url: None,
            sample_patch,
            sample_context,
            palette,
        })
    }
}

impl From<PresetData> for NewPreset {
    fn from(data: PresetData) -> Self {
        Self {
            title: data.title,
            tags: data.tags,
            cover_url: data.cover_url,
            sample_patch: data.sample_patch,
            sample_context: data.sample_context,
            palette: data.palette,
        }
    }
}

/// The full built-in catalog computed against `default_theme`.
pub fn builtin_presets(default_theme: &Value) -> Result<Vec<PresetData>, ThemeError> {
    BUILTIN_SLUGS
        .iter()
        .map(|slug| PresetData::build(slug, default_theme))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresetValidationError {
    #[error("No presets to validate")]
    NoPresets,
    #[error("Found {0} presets with empty titles")]
    EmptyPresetTitles(usize),
    #[error("Preset list file not found")]
    FileNotFound,
    #[error("Failed to parse preset list JSON")]
    InvalidJson,
    #[error("Preset list must have \"titles\" array")]
    MissingTitles,
    #[error("Expected exactly {expected} presets, got {actual}")]
    WrongCount { expected: usize, actual: usize },
    #[error("Found {0} empty preset titles")]
    EmptyListTitles(usize),
    #[error("Found duplicate preset titles")]
    DuplicateTitles,
}

pub fn validate_presets(presets: &[PresetData]) -> Result<(), PresetValidationError> {
    if presets.is_empty() {
        return Err(PresetValidationError::NoPresets);
    }
    let empty = presets.iter().filter(|p| p.title.trim().is_empty()).count();
    if empty > 0 {
        return Err(PresetValidationError::EmptyPresetTitles(empty));
    }
    Ok(())
}

#[derive(Deserialize)]
struct PresetList {
    titles: Option<Value>,
}

/// Checks a `{"titles": [...]}` document and returns the titles.
pub fn validate_preset_list(
    raw: &str,
    expected: usize,
) -> Result<Vec<String>, PresetValidationError> {
    let list: PresetList =
        serde_json::from_str(raw).map_err(|_| PresetValidationError::InvalidJson)?;
    let Some(Value::Array(items)) = list.titles else {
        return Err(PresetValidationError::MissingTitles);
    };
    if items.len() != expected {
        return Err(PresetValidationError::WrongCount {
            expected,
            actual: items.len(),
        });
    }

    let titles: Vec<String> = items
        .iter()
        .map(|item| item.as_str().unwrap_or_default().to_string())
        .collect();
    let empty = titles.iter().filter(|t| t.trim().is_empty()).count();
    if empty > 0 {
        return Err(PresetValidationError::EmptyListTitles(empty));
    }
    let unique: HashSet<&str> = titles.iter().map(String::as_str).collect();
    if unique.len() != titles.len() {
        return Err(PresetValidationError::DuplicateTitles);
    }
    Ok(titles)
}

pub fn validate_preset_file(path: &Path) -> Result<Vec<String>, PresetValidationError> {
    let raw = std::fs::read_to_string(path).map_err(|_| PresetValidationError::FileNotFound)?;
    validate_preset_list(&raw, EXPECTED_PRESET_LIST_LEN)
}

/// Applies preset patches to `base` in order.
pub fn compose<'a>(
    base: &Value,
    patches: impl IntoIterator<Item = &'a [PatchOperation]>,
) -> Result<Value, ThemeError> {
    patches
        .into_iter()
        .try_fold(base.clone(), |theme, ops| apply_patch(&theme, ops))
}

#[cfg(test)]
#[path = "tests/preset_tests.rs"]
mod tests;
