//! Groups the styled objects of a theme into editor categories.

use serde::Serialize;
use serde_json::{Map, Value};

const STYLE_PROPS: &[&str] = &[
    "backgroundColor",
    "textColor",
    "borderRadius",
    "fontSize",
    "fontFamily",
    "fontWeight",
    "color",
    "border",
    "boxShadow",
    "backgroundImage",
    "opacity",
    "padding",
    "margin",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Layout,
    Text,
    Buttons,
    Colors,
    Inputs,
    Containers,
    Icons,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Layout,
        Category::Text,
        Category::Buttons,
        Category::Colors,
        Category::Inputs,
        Category::Containers,
        Category::Icons,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Layout => "Layout",
            Category::Text => "Text",
            Category::Buttons => "Buttons",
            Category::Colors => "Colors",
            Category::Inputs => "Inputs",
            Category::Containers => "Containers",
            Category::Icons => "Icons",
        }
    }

    /// Highlight color used by the editor for this category.
    pub fn color(self) -> &'static str {
        match self {
            Category::Layout => "#FFD700",
            Category::Text => "#FFA500",
            Category::Buttons => "#FF6B35",
            Category::Colors => "#9B59B6",
            Category::Inputs => "#3498DB",
            Category::Containers => "#2ECC71",
            Category::Icons => "#E74C3C",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeElement {
    pub key: String,
    /// Dotted path, e.g. `homeLayer.header`.
    pub path: String,
    pub category: Category,
    pub properties: Vec<String>,
    pub dom_selector: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryGroup {
    pub name: String,
    pub color: String,
    pub elements: Vec<ThemeElement>,
}

fn style_properties(obj: &Map<String, Value>) -> Vec<String> {
    obj.keys()
        .filter(|key| STYLE_PROPS.contains(&key.as_str()) || key.contains("Color") || key.contains("Font"))
        .cloned()
        .collect()
}

fn categorize(key: &str, properties: &[String]) -> Category {
    let key_has = |word: &str, capital: &str| key.contains(word) || key.contains(capital);
    if key_has("button", "Button") {
        return Category::Buttons;
    }
    if key_has("input", "Input") {
        return Category::Inputs;
    }
    if key_has("icon", "Icon") {
        return Category::Icons;
    }
    if key_has("container", "Container") {
        return Category::Containers;
    }
    let any_prop = |part: &str| properties.iter().any(|p| p.contains(part));
    if any_prop("text") || any_prop("font") {
        Category::Text
    } else if any_prop("background") || any_prop("border") {
        Category::Layout
    } else if any_prop("Color") {
        Category::Colors
    } else {
        Category::Layout
    }
}

fn collect(
    obj: &Map<String, Value>,
    path: &str,
    parent_key: &str,
    out: &mut Vec<ThemeElement>,
) {
    for (key, value) in obj {
        let Value::Object(child) = value else {
            continue;
        };
        let current_path = if path.is_empty() {
            key.clone()
        } else {
            format!("{path}.{key}")
        };
        let element_key = if parent_key.is_empty() {
            key.clone()
        } else {
            format!("{parent_key}-{key}")
        };

        let properties = style_properties(child);
        if !properties.is_empty() {
            out.push(ThemeElement {
                category: categorize(key, &properties),
                dom_selector: format!("[data-element-id=\"{element_key}\"]"),
                description: format!("{key} - Customizable: {}", properties.join(", ")),
                key: element_key.clone(),
                path: current_path.clone(),
                properties,
            });
        }
        collect(child, &current_path, &element_key, out);
    }
}

/// Every styled object in `theme`, in document order.
pub fn theme_elements(theme: &Value) -> Vec<ThemeElement> {
    let mut out = Vec::new();
    if let Value::Object(root) = theme {
        collect(root, "", "", &mut out);
    }
    out
}

/// Styled objects grouped by category; every category is present, possibly empty.
pub fn analyze_theme_structure(theme: &Value) -> Vec<CategoryGroup> {
    let elements = theme_elements(theme);
    Category::ALL
        .iter()
        .map(|category| CategoryGroup {
            name: category.label().to_string(),
            color: category.color().to_string(),
            elements: elements
                .iter()
                .filter(|e| e.category == *category)
                .cloned()
                .collect(),
        })
        .collect()
}
