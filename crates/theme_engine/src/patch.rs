use json_patch::PatchOperation;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThemeError {
    #[error("JSON Patch failed: {0}")]
    Patch(String),
    #[error("invalid JSON pointer '{0}'")]
    InvalidPointer(String),
    #[error("cannot set '{0}': parent is not an object or array")]
    NotAContainer(String),
    #[error("no preview to commit")]
    NoPreview,
    #[error("failed to build patch operation: {0}")]
    Operation(String),
}

/// Applies `ops` to a copy of `doc`. The input document is never touched, and a
/// failing operation leaves no partial result behind.
pub fn apply_patch(doc: &Value, ops: &[PatchOperation]) -> Result<Value, ThemeError> {
    let mut next = doc.clone();
    json_patch::patch(&mut next, ops).map_err(|e| ThemeError::Patch(e.to_string()))?;
    Ok(next)
}

pub fn diff(before: &Value, after: &Value) -> Vec<PatchOperation> {
    json_patch::diff(before, after).0
}

/// Patch that takes `after` back to `before`.
pub fn inverse_patch(before: &Value, after: &Value) -> Vec<PatchOperation> {
    diff(after, before)
}

pub fn replace_op(path: &str, value: Value) -> Result<PatchOperation, ThemeError> {
    build_op(json!({ "op": "replace", "path": path, "value": value }))
}

pub fn add_op(path: &str, value: Value) -> Result<PatchOperation, ThemeError> {
    build_op(json!({ "op": "add", "path": path, "value": value }))
}

fn build_op(raw: Value) -> Result<PatchOperation, ThemeError> {
    serde_json::from_value(raw).map_err(|e| ThemeError::Operation(e.to_string()))
}

pub fn op_kind(op: &PatchOperation) -> &'static str {
    match op {
        PatchOperation::Add(_) => "add",
        PatchOperation::Remove(_) => "remove",
        PatchOperation::Replace(_) => "replace",
        PatchOperation::Move(_) => "move",
        PatchOperation::Copy(_) => "copy",
        PatchOperation::Test(_) => "test",
    }
}

pub fn op_path(op: &PatchOperation) -> Option<String> {
    serde_json::to_value(op)
        .ok()?
        .get("path")?
        .as_str()
        .map(str::to_string)
}

/// RFC 6901 escaping of a single reference token.
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Accepts `a/b`, `/a/b` and `//a/b` alike and returns `/a/b`.
pub fn normalize_pointer(pointer: &str) -> String {
    let trimmed = pointer.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

fn split_pointer(pointer: &str) -> Vec<String> {
    let normalized = normalize_pointer(pointer);
    if normalized.is_empty() {
        return Vec::new();
    }
    normalized[1..].split('/').map(unescape_token).collect()
}

pub fn get_pointer<'a>(doc: &'a Value, pointer: &str) -> Option<&'a Value> {
    doc.pointer(&normalize_pointer(pointer))
}

/// Writes `value` at `pointer`, creating missing intermediate objects. Scalars
/// sitting where an intermediate object is needed are replaced.
pub fn set_pointer(doc: &mut Value, pointer: &str, value: Value) -> Result<(), ThemeError> {
    let tokens = split_pointer(pointer);
    let Some((last, parents)) = tokens.split_last() else {
        return Err(ThemeError::InvalidPointer(pointer.to_string()));
    };

    let mut current = doc;
    for token in parents {
        current = match current {
            Value::Object(map) => {
                let child = map
                    .entry(token.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !child.is_object() && !child.is_array() {
                    *child = Value::Object(Map::new());
                }
                child
            }
            Value::Array(items) => {
                let index = parse_index(token, pointer)?;
                items
                    .get_mut(index)
                    .ok_or_else(|| ThemeError::InvalidPointer(pointer.to_string()))?
            }
            _ => return Err(ThemeError::NotAContainer(pointer.to_string())),
        };
    }

    match current {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(items) if last == "-" => {
            items.push(value);
            Ok(())
        }
        Value::Array(items) => {
            let index = parse_index(last, pointer)?;
            if index < items.len() {
                items[index] = value;
            } else if index == items.len() {
                items.push(value);
            } else {
                return Err(ThemeError::InvalidPointer(pointer.to_string()));
            }
            Ok(())
        }
        _ => Err(ThemeError::NotAContainer(pointer.to_string())),
    }
}

fn parse_index(token: &str, pointer: &str) -> Result<usize, ThemeError> {
    token
        .parse::<usize>()
        .map_err(|_| ThemeError::InvalidPointer(pointer.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    String,
    Number,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarPath {
    pub path: String,
    pub kind: ScalarKind,
}

/// Every string, number and boolean leaf reachable through objects. Arrays are
/// not descended into.
pub fn enumerate_scalars(doc: &Value) -> Vec<ScalarPath> {
    let mut out = Vec::new();
    collect_scalars(doc, String::new(), &mut out);
    out
}

fn collect_scalars(value: &Value, path: String, out: &mut Vec<ScalarPath>) {
    let kind = match value {
        Value::String(_) => ScalarKind::String,
        Value::Number(_) => ScalarKind::Number,
        Value::Bool(_) => ScalarKind::Boolean,
        Value::Object(map) => {
            for (key, child) in map {
                collect_scalars(child, format!("{path}/{}", escape_token(key)), out);
            }
            return;
        }
        Value::Array(_) | Value::Null => return,
    };
    out.push(ScalarPath { path, kind });
}

#[cfg(test)]
#[path = "tests/patch_tests.rs"]
mod tests;
