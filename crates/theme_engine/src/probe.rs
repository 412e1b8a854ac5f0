//! Finds which theme value drives which rendered element by perturbing one
//! scalar at a time and watching the element styles change.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::patch::{enumerate_scalars, set_pointer};

pub const DEFAULT_STYLE_PROPS: &[&str] = &[
    "color",
    "background-color",
    "border-color",
    "outline-color",
    "fill",
    "stroke",
    "font-size",
    "font-weight",
    "opacity",
    "box-shadow",
    "text-shadow",
];

const KEY_PROPS: &[&str] = &["color", "background-color", "fill", "stroke"];
const AMBIGUOUS_BELOW: f64 = 0.6;
const SIGNAL_COLOR: &str = "rgb(1, 2, 3)";
const SIGNAL_SIZE: &str = "999px";

pub fn default_prefixes(screen: &str) -> &'static [&'static str] {
    match screen {
        "lock" => &["lock-", "unlock-"],
        _ => &["home-", "action-", "header-"],
    }
}

/// Element id to style property to computed value.
pub type StyleSnapshot = BTreeMap<String, BTreeMap<String, String>>;

/// Something that can render a theme and report element styles.
#[async_trait]
pub trait StyleSurface: Send + Sync {
    /// Rendered element ids starting with any of `prefixes`.
    async fn element_ids(&self, prefixes: &[String]) -> Result<Vec<String>>;

    async fn snapshot(&self, theme: &Value, ids: &[String], props: &[String])
        -> Result<StyleSnapshot>;
}

/// Headless surface: each element's style properties read straight from
/// theme pointers given by a binding map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingSurface {
    bindings: BTreeMap<String, BTreeMap<String, String>>,
}

impl BindingSurface {
    pub fn new(bindings: BTreeMap<String, BTreeMap<String, String>>) -> Self {
        Self { bindings }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

fn css_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[async_trait]
impl StyleSurface for BindingSurface {
    async fn element_ids(&self, prefixes: &[String]) -> Result<Vec<String>> {
        Ok(self
            .bindings
            .keys()
            .filter(|id| prefixes.iter().any(|p| id.starts_with(p.as_str())))
            .cloned()
            .collect())
    }

    async fn snapshot(
        &self,
        theme: &Value,
        ids: &[String],
        props: &[String],
    ) -> Result<StyleSnapshot> {
        let mut out = StyleSnapshot::new();
        for id in ids {
            let Some(binding) = self.bindings.get(id) else {
                continue;
            };
            let styles = props
                .iter()
                .map(|prop| {
                    let value = binding.get(prop).and_then(|ptr| theme.pointer(ptr));
                    (prop.clone(), css_value(value))
                })
                .collect();
            out.insert(id.clone(), styles);
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProbeStatus {
    Ok,
    Ambiguous,
    Unmapped,
    NonScalar,
}

impl ProbeStatus {
    fn label(self) -> &'static str {
        match self {
            ProbeStatus::Ok => "OK",
            ProbeStatus::Ambiguous => "AMBIGUOUS",
            ProbeStatus::Unmapped => "UNMAPPED",
            ProbeStatus::NonScalar => "NON_SCALAR",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub screen: String,
    pub id_prefixes: Vec<String>,
    pub style_props: Vec<String>,
}

impl ProbeOptions {
    pub fn for_screen(screen: impl Into<String>) -> Self {
        let screen = screen.into();
        Self {
            id_prefixes: default_prefixes(&screen).iter().map(|p| p.to_string()).collect(),
            style_props: DEFAULT_STYLE_PROPS.iter().map(|p| p.to_string()).collect(),
            screen,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub path: String,
    pub weight: u32,
    pub changed_props: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_path: Option<String>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_props: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<Candidate>,
    pub status: ProbeStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ProbeTotals {
    pub ok: usize,
    pub ambiguous: usize,
    pub unmapped: usize,
    pub non_scalar: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub items: Vec<MappingItem>,
    pub coverage: f64,
    pub totals: ProbeTotals,
}

/// Replacement value that makes a change to `path` visible, or `None` for
/// values not worth probing.
pub fn generate_signal(path: &str, current: &Value) -> Option<Value> {
    let path = path.to_ascii_lowercase();
    match current {
        Value::String(s) => {
            let colorish = path.contains("color")
                || path.contains("gradient")
                || s.starts_with('#')
                || s.contains("rgb")
                || s.contains("hsl");
            if colorish {
                Some(json!(SIGNAL_COLOR))
            } else if path.contains("size") && has_px_size(s) {
                Some(json!(SIGNAL_SIZE))
            } else {
                None
            }
        }
        Value::Number(n) => {
            let visual = ["size", "width", "radius", "opacity", "weight"]
                .iter()
                .any(|part| path.contains(part));
            if !visual {
                return None;
            }
            match n.as_i64() {
                Some(i) => Some(json!(i + 10)),
                None => n.as_f64().map(|f| json!(f + 10.0)),
            }
        }
        _ => None,
    }
}

fn has_px_size(value: &str) -> bool {
    value
        .match_indices("px")
        .any(|(at, _)| value[..at].ends_with(|c: char| c.is_ascii_digit()))
}

fn weigh(changed: &[String]) -> u32 {
    let key = changed.iter().filter(|p| KEY_PROPS.contains(&p.as_str())).count();
    (changed.len() + key) as u32
}

pub struct ThemeProbe<S> {
    surface: S,
    theme: Value,
}

impl<S: StyleSurface> ThemeProbe<S> {
    pub fn new(surface: S, theme: Value) -> Self {
        Self { surface, theme }
    }

    pub async fn build_mapping(&self, opts: &ProbeOptions) -> Result<ProbeResult> {
        info!(screen = %opts.screen, "building element mapping");
        let ids = self.surface.element_ids(&opts.id_prefixes).await?;
        if ids.is_empty() {
            warn!(screen = %opts.screen, "no elements found for probe");
            return Ok(ProbeResult::default());
        }

        let baseline = self
            .surface
            .snapshot(&self.theme, &ids, &opts.style_props)
            .await?;
        let scalars = enumerate_scalars(&self.theme);
        debug!(elements = ids.len(), scalars = scalars.len(), "probe inputs");

        let mut by_element: BTreeMap<&str, Vec<Candidate>> = BTreeMap::new();
        for (index, scalar) in scalars.iter().enumerate() {
            let Some(current) = self.theme.pointer(&scalar.path) else {
                continue;
            };
            let Some(signal) = generate_signal(&scalar.path, current) else {
                continue;
            };
            debug!(index, total = scalars.len(), path = %scalar.path, "probing");

            let mut signalled = self.theme.clone();
            set_pointer(&mut signalled, &scalar.path, signal)?;
            let after = self
                .surface
                .snapshot(&signalled, &ids, &opts.style_props)
                .await?;

            for id in &ids {
                let (Some(before), Some(after)) = (baseline.get(id), after.get(id)) else {
                    continue;
                };
                let changed: Vec<String> = opts
                    .style_props
                    .iter()
                    .filter(|prop| before.get(*prop) != after.get(*prop))
                    .cloned()
                    .collect();
                if changed.is_empty() {
                    continue;
                }
                by_element.entry(id.as_str()).or_default().push(Candidate {
                    path: scalar.path.clone(),
                    weight: weigh(&changed),
                    changed_props: changed,
                });
            }
        }

        let items: Vec<MappingItem> = ids
            .iter()
            .map(|id| select_best(id, by_element.remove(id.as_str()).unwrap_or_default()))
            .collect();

        let mut totals = ProbeTotals::default();
        for item in &items {
            match item.status {
                ProbeStatus::Ok => totals.ok += 1,
                ProbeStatus::Ambiguous => totals.ambiguous += 1,
                ProbeStatus::Unmapped => totals.unmapped += 1,
                ProbeStatus::NonScalar => totals.non_scalar += 1,
            }
        }
        let coverage = totals.ok as f64 / ids.len() as f64;
        info!(
            ok = totals.ok,
            ambiguous = totals.ambiguous,
            unmapped = totals.unmapped,
            coverage,
            "element mapping complete"
        );

        Ok(ProbeResult {
            items,
            coverage,
            totals,
        })
    }
}

fn select_best(id: &str, mut candidates: Vec<Candidate>) -> MappingItem {
    if candidates.is_empty() {
        return MappingItem {
            id: id.to_string(),
            best_path: None,
            confidence: 0.0,
            changed_props: Vec::new(),
            candidates,
            status: ProbeStatus::Unmapped,
        };
    }
    candidates.sort_by(|a, b| b.weight.cmp(&a.weight));
    let total: u32 = candidates.iter().map(|c| c.weight).sum();
    let best = &candidates[0];
    let confidence = f64::from(best.weight) / f64::from(total);
    let status = if confidence < AMBIGUOUS_BELOW && candidates.len() >= 2 {
        ProbeStatus::Ambiguous
    } else {
        ProbeStatus::Ok
    };
    MappingItem {
        id: id.to_string(),
        best_path: Some(best.path.clone()),
        confidence,
        changed_props: best.changed_props.clone(),
        status,
        candidates,
    }
}

impl ProbeResult {
    /// Confident mappings only, ready to be written back to the element catalog.
    pub fn autogen(&self, screen: &str, generated_at: &str) -> Value {
        let items: Vec<Value> = self
            .items
            .iter()
            .filter(|i| i.status == ProbeStatus::Ok)
            .map(|i| {
                json!({
                    "id": i.id,
                    "path": i.best_path,
                    "confidence": i.confidence,
                    "changedProps": i.changed_props,
                    "status": i.status,
                })
            })
            .collect();
        json!({
            "screen": screen,
            "generatedAt": generated_at,
            "coverage": self.coverage,
            "items": items,
        })
    }

    pub fn report(&self, screen: &str, generated_at: &str) -> Value {
        json!({
            "screen": screen,
            "generatedAt": generated_at,
            "coverage": self.coverage,
            "totals": self.totals,
            "items": self.items,
        })
    }

    pub fn summary_markdown(&self, screen: &str, generated_at: &str) -> String {
        let mut md = format!("# ThemeProbe Mapping Summary: {screen}\n\n");
        let _ = writeln!(md, "Generated: {generated_at}\n");
        md.push_str("## Overview\n\n");
        let _ = writeln!(md, "- **Coverage**: {:.1}%", self.coverage * 100.0);
        let _ = writeln!(md, "- **Total Elements**: {}\n", self.items.len());
        md.push_str("## Status Breakdown\n\n| Status | Count |\n|--------|-------|\n");
        for (status, count) in [
            (ProbeStatus::Ok, self.totals.ok),
            (ProbeStatus::Ambiguous, self.totals.ambiguous),
            (ProbeStatus::Unmapped, self.totals.unmapped),
            (ProbeStatus::NonScalar, self.totals.non_scalar),
        ] {
            let _ = writeln!(md, "| {} | {count} |", status.label());
        }
        md.push('\n');

        let problematic: Vec<&MappingItem> = self
            .items
            .iter()
            .filter(|i| i.status != ProbeStatus::Ok)
            .collect();
        if !problematic.is_empty() {
            let _ = writeln!(md, "## Problematic Elements ({})\n", problematic.len());
            md.push_str("| ID | Status | Confidence | Best Path |\n");
            md.push_str("|----|--------|------------|-----------|\n");
            for item in problematic {
                let _ = writeln!(
                    md,
                    "| {} | {} | {:.1}% | {} |",
                    item.id,
                    item.status.label(),
                    item.confidence * 100.0,
                    item.best_path.as_deref().unwrap_or("N/A")
                );
            }
        }
        md
    }
}

#[cfg(test)]
#[path = "tests/probe_tests.rs"]
mod tests;
