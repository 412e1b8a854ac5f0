//! Summaries over the wallet element catalog and its JSON path mappings.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;
use shared::{
    domain::WalletElement,
    protocol::{
        ElementStatistics, MappingStats, ScreenCounts, ScreenElements, ScreenGroup,
    },
};

const UNSPECIFIED_POSITION: &str = "unspecified";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathType {
    Component,
    Style,
    Asset,
    Icon,
}

pub fn infer_path_type(json_path: &str) -> PathType {
    if json_path.contains("/styles/") {
        PathType::Style
    } else if json_path.contains("/assets/") {
        PathType::Asset
    } else if json_path.contains("/icons/") || json_path.contains("Icon") {
        PathType::Icon
    } else {
        PathType::Component
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementContext {
    pub element: WalletElement,
    pub json_path: String,
    pub path_type: PathType,
    pub expected_value_type: &'static str,
}

/// Path details for a mapped element; `None` while the element has no path.
pub fn element_context(element: &WalletElement) -> Option<ElementContext> {
    let json_path = element.json_path.clone()?;
    let path_type = infer_path_type(&json_path);
    let expected_value_type = match path_type {
        PathType::Style => "string (color/css)",
        _ => "object or string",
    };
    Some(ElementContext {
        element: element.clone(),
        json_path,
        path_type,
        expected_value_type,
    })
}

/// Screens in order of first appearance, each with its elements.
fn screens_in_order(elements: &[WalletElement]) -> Vec<(&str, Vec<&WalletElement>)> {
    let mut out: Vec<(&str, Vec<&WalletElement>)> = Vec::new();
    for element in elements {
        match out.iter_mut().find(|(screen, _)| *screen == element.screen) {
            Some((_, list)) => list.push(element),
            None => out.push((element.screen.as_str(), vec![element])),
        }
    }
    out
}

/// Markdown registry of elements and their paths, grouped by screen.
pub fn format_element_context(elements: &[WalletElement]) -> String {
    if elements.is_empty() {
        return "No element mappings available yet.".to_string();
    }

    let mut out = String::from("# UI Elements Registry\n\n");
    out.push_str("Available customizable elements and their JSON paths:\n\n");
    for (screen, list) in screens_in_order(elements) {
        let _ = writeln!(out, "## {} Screen\n", screen.to_uppercase());
        for el in list {
            let _ = writeln!(out, "### {}", el.name);
            let _ = writeln!(out, "- **ID**: {}", el.id);
            let _ = writeln!(out, "- **Type**: {}", el.kind);
            let _ = writeln!(out, "- **Description**: {}", el.description);
            if let Some(position) = &el.position {
                let _ = writeln!(out, "- **Position**: {position}");
            }
            match &el.json_path {
                Some(path) => {
                    let _ = writeln!(out, "- **JSON Path**: `{path}`");
                    let _ = writeln!(
                        out,
                        "- **Example**: To modify this element, use patch operation on path: {path}"
                    );
                }
                None => out.push_str("- **JSON Path**: Not mapped yet\n"),
            }
            out.push('\n');
        }
    }
    out
}

fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        0
    } else {
        ((part as f64 / total as f64) * 100.0).round() as u32
    }
}

/// Mapping coverage over customizable elements.
pub fn mapping_stats(elements: &[WalletElement]) -> MappingStats {
    let mut stats = MappingStats::default();
    for el in elements.iter().filter(|e| e.customizable) {
        let mapped = el.json_path.is_some();
        stats.total += 1;
        let screen = stats.by_screen.entry(el.screen.clone()).or_default();
        screen.total += 1;
        if mapped {
            stats.mapped += 1;
            screen.mapped += 1;
        }
    }
    stats.unmapped = stats.total - stats.mapped;
    stats.coverage_percent = percent(stats.mapped, stats.total);
    stats
}

/// Customizable elements that carry a path, ordered by screen then name.
pub fn mapped_elements(elements: &[WalletElement]) -> Vec<WalletElement> {
    let mut mapped: Vec<WalletElement> = elements
        .iter()
        .filter(|e| e.customizable && e.json_path.is_some())
        .cloned()
        .collect();
    mapped.sort_by(|a, b| a.screen.cmp(&b.screen).then_with(|| a.name.cmp(&b.name)));
    mapped
}

fn count(elements: &[&WalletElement]) -> ScreenCounts {
    let mut counts = ScreenCounts::default();
    for el in elements {
        counts.total += 1;
        if el.customizable {
            counts.customizable += 1;
        }
        *counts.by_type.entry(el.kind.clone()).or_default() += 1;
    }
    counts
}

pub fn group_by_screen(elements: &[WalletElement]) -> Vec<ScreenGroup> {
    screens_in_order(elements)
        .into_iter()
        .map(|(screen, list)| ScreenGroup {
            screen: screen.to_string(),
            counts: count(&list),
            elements: list.into_iter().cloned().collect(),
        })
        .collect()
}

/// Elements of one screen, also bucketed by position.
pub fn by_screen(elements: &[WalletElement], screen: &str) -> ScreenElements {
    let on_screen: Vec<WalletElement> = elements
        .iter()
        .filter(|e| e.screen == screen)
        .cloned()
        .collect();
    let mut by_position: BTreeMap<String, Vec<WalletElement>> = BTreeMap::new();
    for el in &on_screen {
        let position = el.position.as_deref().unwrap_or(UNSPECIFIED_POSITION);
        by_position
            .entry(position.to_string())
            .or_default()
            .push(el.clone());
    }
    ScreenElements {
        screen: screen.to_string(),
        count: on_screen.len(),
        customizable_count: on_screen.iter().filter(|e| e.customizable).count(),
        elements: on_screen,
        by_position,
    }
}

pub fn statistics(elements: &[WalletElement]) -> ElementStatistics {
    let mut stats = ElementStatistics {
        total: elements.len(),
        customizable: elements.iter().filter(|e| e.customizable).count(),
        ..Default::default()
    };
    stats.customization_percentage = percent(stats.customizable, stats.total);
    for (screen, list) in screens_in_order(elements) {
        stats.screens.insert(screen.to_string(), count(&list));
    }
    for el in elements {
        *stats.types.entry(el.kind.clone()).or_default() += 1;
        let position = el.position.as_deref().unwrap_or(UNSPECIFIED_POSITION);
        *stats.positions.entry(position.to_string()).or_default() += 1;
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::protocol::ScreenCoverage;

    fn element(id: &str, screen: &str, json_path: Option<&str>) -> WalletElement {
        WalletElement {
            id: id.into(),
            screen: screen.into(),
            name: id.replace('-', " "),
            kind: "button".into(),
            description: format!("{id} element"),
            customizable: true,
            custom_props: vec!["backgroundColor".into()],
            position: None,
            selector: None,
            json_path: json_path.map(Into::into),
        }
    }

    #[test]
    fn infers_path_types() {
        assert_eq!(infer_path_type("/home/styles/bg"), PathType::Style);
        assert_eq!(infer_path_type("/home/assets/logo"), PathType::Asset);
        assert_eq!(infer_path_type("/homeLayer/header/accountIconColor"), PathType::Icon);
        assert_eq!(infer_path_type("/homeLayer/header"), PathType::Component);
    }

    #[test]
    fn context_requires_a_path() {
        assert!(element_context(&element("a", "home", None)).is_none());
        let ctx = element_context(&element("a", "home", Some("/x/styles/color"))).expect("ctx");
        assert_eq!(ctx.path_type, PathType::Style);
        assert_eq!(ctx.expected_value_type, "string (color/css)");
    }

    #[test]
    fn formats_registry_by_screen() {
        assert_eq!(format_element_context(&[]), "No element mappings available yet.");
        let text = format_element_context(&[
            element("unlock-button", "lock", Some("/lockLayer/unlockButton")),
            element("home-footer", "home", None),
        ]);
        assert!(text.starts_with("# UI Elements Registry"));
        assert!(text.find("## LOCK Screen") < text.find("## HOME Screen"));
        assert!(text.contains("- **JSON Path**: `/lockLayer/unlockButton`"));
        assert!(text.contains("- **JSON Path**: Not mapped yet"));
    }

    #[test]
    fn mapping_stats_ignore_fixed_elements() {
        let mut fixed = element("badge", "home", None);
        fixed.customizable = false;
        let stats = mapping_stats(&[
            element("a", "home", Some("/a")),
            element("b", "home", None),
            element("c", "lock", Some("/c")),
            fixed,
        ]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.mapped, 2);
        assert_eq!(stats.unmapped, 1);
        assert_eq!(stats.coverage_percent, 67);
        assert_eq!(stats.by_screen["home"], ScreenCoverage { total: 2, mapped: 1 });
        assert_eq!(mapping_stats(&[]).coverage_percent, 0);
    }

    #[test]
    fn catalog_statistics_are_consistent() {
        let catalog = crate::builtin_wallet_elements();
        let stats = statistics(&catalog);
        assert_eq!(stats.total, catalog.len());
        assert_eq!(stats.screens.values().map(|c| c.total).sum::<usize>(), catalog.len());
        assert_eq!(stats.positions.values().sum::<usize>(), catalog.len());

        let groups = group_by_screen(&catalog);
        assert_eq!(groups[0].screen, catalog[0].screen);

        let home = by_screen(&catalog, "home");
        assert_eq!(home.count, home.by_position.values().map(Vec::len).sum::<usize>());
        assert!(home.customizable_count < home.count);

        let mapped = mapped_elements(&catalog);
        assert!(mapped.iter().all(|e| e.json_path.is_some() && e.customizable));
    }
}
