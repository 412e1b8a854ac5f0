//! Fixed set of theme paths an image-derived palette may recolor.

use json_patch::PatchOperation;
use serde_json::Value;
use shared::domain::Palette;

use crate::{
    palette::{ensure_contrast, is_color_value},
    patch::{replace_op, ThemeError},
};

pub const CENTER_BACKGROUNDS: &[&str] = &[
    "/lockLayer/backgroundColor",
    "/homeLayer/backgroundColor",
    "/receiveLayer/centerContainer/backgroundColor",
    "/sendLayer/centerContainer/backgroundColor",
    "/buyLayer/centerContainer/backgroundColor",
];

pub const SECONDARY_BACKGROUNDS: &[&str] = &[
    "/homeLayer/header/backgroundColor",
    "/homeLayer/footer/backgroundColor",
    "/homeLayer/mainContainer/backgroundColor",
    "/assetCard/backgroundColor",
];

pub const TEXT_COLORS: &[&str] = &[
    "/lockLayer/title/textColor",
    "/lockLayer/forgotPassword/textColor",
    "/lockLayer/unlockButton/textColor",
    "/homeLayer/totalBalanceLabel/textColor",
    "/homeLayer/totalBalanceValue/textColor",
    "/homeLayer/totalBalanceChange/zeroColor",
    "/homeLayer/header/textColor",
    "/homeLayer/footer/textColor",
    "/sendLayer/selectNetworkLabel/textColor",
    "/sendLayer/selectNetworkDescription/textColor",
    "/sendLayer/emptyState/textColor",
];

pub const ACCENT_COLORS: &[&str] = &[
    "/homeLayer/actionButtons/receiveButton/containerColor",
    "/homeLayer/actionButtons/sendButton/containerColor",
    "/homeLayer/actionButtons/buyButton/containerColor",
    "/lockLayer/unlockButton/backgroundColor",
    "/buyLayer/buyButton/backgroundColor",
    "/sendLayer/footer/closeButton/backgroundColor",
    "/buyLayer/footer/closeButton/backgroundColor",
    "/homeLayer/footer/activeIconColor",
    "/homeLayer/footer/activeTextColor",
];

/// Layers whose `backgroundColor` must stay put while they show an image.
pub const IMAGE_PROTECTED_PATHS: &[&str] = &[
    "/lockLayer",
    "/homeLayer",
    "/receiveLayer/centerContainer",
    "/sendLayer/centerContainer",
    "/buyLayer/centerContainer",
];

pub fn allowed_vision_paths() -> impl Iterator<Item = &'static str> {
    CENTER_BACKGROUNDS
        .iter()
        .chain(SECONDARY_BACKGROUNDS)
        .chain(TEXT_COLORS)
        .chain(ACCENT_COLORS)
        .copied()
}

pub fn is_allowed_vision_path(path: &str) -> bool {
    allowed_vision_paths().any(|p| p == path)
}

fn shows_image(theme: &Value, path: &str) -> bool {
    let Some(parent) = path.strip_suffix("/backgroundColor") else {
        return false;
    };
    IMAGE_PROTECTED_PATHS.contains(&parent)
        && theme
            .pointer(&format!("{parent}/backgroundImage"))
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty())
}

/// Replace-only patch over the whitelist. Paths missing from the theme or not
/// holding a color are skipped, as are backgrounds of layers showing an image.
pub fn vision_patch(palette: &Palette, theme: &Value) -> Result<Vec<PatchOperation>, ThemeError> {
    let text = ensure_contrast(&palette.fg, &palette.bg);
    let groups: [(&[&str], &str); 4] = [
        (CENTER_BACKGROUNDS, &palette.bg),
        (SECONDARY_BACKGROUNDS, &palette.neutral),
        (TEXT_COLORS, &text),
        (ACCENT_COLORS, &palette.primary),
    ];

    let mut ops = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for (paths, color) in groups {
        for path in paths {
            if !seen.insert(*path) {
                continue;
            }
            let Some(current) = theme.pointer(path).and_then(Value::as_str) else {
                continue;
            };
            if !is_color_value(current) || current == color || shows_image(theme, path) {
                continue;
            }
            ops.push(replace_op(path, Value::String(color.to_string()))?);
        }
    }
    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{apply_patch, op_path};
    use serde_json::json;

    #[test]
    fn whitelist_lookup() {
        assert!(is_allowed_vision_path("/assetCard/backgroundColor"));
        assert!(!is_allowed_vision_path("/assetCard/icon"));
    }

    #[test]
    fn recolors_default_theme_within_whitelist() {
        let theme = crate::default_theme();
        let palette = Palette::default();
        let ops = vision_patch(&palette, &theme).expect("ops");
        assert!(ops
            .iter()
            .filter_map(op_path)
            .all(|p| is_allowed_vision_path(&p)));

        let themed = apply_patch(&theme, &ops).expect("apply");
        assert_eq!(themed["homeLayer"]["backgroundColor"], palette.bg.as_str());
        assert_eq!(
            themed["homeLayer"]["actionButtons"]["sendButton"]["containerColor"],
            palette.primary.as_str()
        );
    }

    #[test]
    fn leaves_image_backed_layers_alone() {
        let theme = json!({
            "lockLayer": { "backgroundColor": "#000000", "backgroundImage": "bg.png" },
            "homeLayer": { "backgroundColor": "#000000" }
        });
        let ops = vision_patch(&Palette::default(), &theme).expect("ops");
        let paths: Vec<_> = ops.iter().filter_map(op_path).collect();
        assert_eq!(paths, vec!["/homeLayer/backgroundColor"]);
    }
}
