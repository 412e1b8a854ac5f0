//! Recolors a theme from a palette. Only `replace` operations are produced, so
//! the patch never changes the shape of the theme.

use json_patch::PatchOperation;
use serde_json::{Map, Value};
use shared::domain::Palette;
use tracing::debug;

use crate::{
    palette::{is_color_value, to_rgba},
    patch::{escape_token, replace_op, ThemeError},
};

pub const DEFAULT_SAFE_PREFIXES: &[&str] = &[
    "/lockLayer",
    "/homeLayer",
    "/sidebarLayer",
    "/receiveLayer",
    "/sendLayer",
    "/swapLayer",
    "/appsLayer",
    "/historyLayer",
    "/searchLayer",
    "/globalSearchInput",
    "/assetCard",
    "/global",
    "/inputs",
    "/sidebar",
    "/dropdownMenu",
    "/assetContainer",
    "/assetList",
];

const COLOR_KEY_SUFFIXES: &[&str] = &["color", "Color"];
const FORBIDDEN_KEY_PARTS: &[&str] = &["image", "url", "src", "icon", "svg", "path", "href"];
const URL_MARKERS: &[&str] = &[
    "http://", "https://", "supabase.co", "data:image", "blob:", ".png", ".jpg", ".jpeg", ".svg",
    ".gif",
];

fn is_color_key(key: &str) -> bool {
    COLOR_KEY_SUFFIXES.iter().any(|suffix| key.ends_with(suffix))
}

/// Keys touching assets, color keys included (`iconColor` is left alone).
fn is_forbidden_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    FORBIDDEN_KEY_PARTS.iter().any(|part| lower.contains(part))
}

fn looks_like_url(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    URL_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn has_background_image(parent: &Map<String, Value>) -> bool {
    parent
        .get("backgroundImage")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

/// Picks the palette slot for a color property from its path and key.
pub fn decide_color(path: &str, key: &str, palette: &Palette) -> String {
    let k = key.to_ascii_lowercase();
    let p = path.to_ascii_lowercase();
    let border = || to_rgba(&palette.fg, 0.24);

    if k.ends_with("textcolor") || k.ends_with("iconcolor") {
        return palette.fg.clone();
    }
    if k.ends_with("bordercolor") {
        return border();
    }

    if p.contains("button") || p.contains("unlock") || p.contains("action") {
        if k.contains("text") || k.contains("icon") || k.contains("label") {
            return palette.fg.clone();
        }
        if k.contains("background") || k.contains("color") {
            return palette.primary.clone();
        }
    }

    if p.contains("sidebar") || p.contains("dropdown") || p.contains("menu") {
        if k.contains("background") {
            return palette.neutral.clone();
        }
        if k.contains("text") || k.contains("icon") {
            return palette.fg.clone();
        }
        if k.contains("border") {
            return border();
        }
    }

    if p.contains("asset") {
        if k.contains("background") {
            return palette.neutral.clone();
        }
        if k.contains("text") {
            return palette.fg.clone();
        }
        if k.contains("border") {
            return to_rgba(&palette.fg, 0.12);
        }
    }

    if p.contains("/homelayer/backgroundcolor") || p.contains("/locklayer/backgroundcolor") {
        return palette.bg.clone();
    }

    if p.contains("header") || p.contains("footer") || p.contains("container") || p.contains("card") {
        return palette.neutral.clone();
    }

    if k.contains("background") {
        return palette.bg.clone();
    }

    palette.fg.clone()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GenerateStats {
    pub visited: usize,
    pub skipped_outside_prefixes: usize,
    pub replaced: usize,
}

/// Walks `theme` and emits a `replace` for each color value that should take
/// a palette color. An empty `safe_prefixes` list allows every path.
pub fn generate_patch_from_palette(
    palette: &Palette,
    theme: &Value,
    safe_prefixes: &[&str],
) -> Result<Vec<PatchOperation>, ThemeError> {
    let (ops, stats) = generate_with_stats(palette, theme, safe_prefixes)?;
    debug!(
        visited = stats.visited,
        skipped = stats.skipped_outside_prefixes,
        replaced = stats.replaced,
        "palette patch generated"
    );
    Ok(ops)
}

pub fn generate_with_stats(
    palette: &Palette,
    theme: &Value,
    safe_prefixes: &[&str],
) -> Result<(Vec<PatchOperation>, GenerateStats), ThemeError> {
    let within_safe =
        |path: &str| safe_prefixes.is_empty() || safe_prefixes.iter().any(|p| path.starts_with(p));

    let mut ops = Vec::new();
    let mut stats = GenerateStats::default();
    let mut stack: Vec<(&Value, String)> = vec![(theme, String::new())];

    while let Some((value, path)) = stack.pop() {
        stats.visited += 1;
        match value {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    stack.push((item, format!("{path}/{i}")));
                }
            }
            Value::Object(map) => {
                for (key, child) in map {
                    let child_path = format!("{path}/{}", escape_token(key));
                    if child.is_object() {
                        stack.push((child, child_path));
                        continue;
                    }
                    if !within_safe(&child_path) {
                        stats.skipped_outside_prefixes += 1;
                        continue;
                    }
                    if is_forbidden_key(key) {
                        continue;
                    }
                    let Some(current) = child.as_str() else {
                        continue;
                    };
                    if looks_like_url(current) || !is_color_key(key) || !is_color_value(current) {
                        continue;
                    }
                    let lower_key = key.to_ascii_lowercase();
                    if lower_key.contains("background") && has_background_image(map) {
                        continue;
                    }

                    let next = decide_color(&child_path, key, palette);
                    if next != current {
                        ops.push(replace_op(&child_path, Value::String(next))?);
                        stats.replaced += 1;
                    }
                }
            }
            _ => {}
        }
    }

    Ok((ops, stats))
}
