use json_patch::PatchOperation;
use serde_json::Value;
use shared::domain::{PresetId, ThemeId, ThemePatch};
use tracing::{debug, warn};

use crate::patch::{apply_patch, diff, set_pointer, ThemeError};

/// Oldest entries are folded into the base theme past this many.
pub const MAX_HISTORY: usize = 100;

#[derive(Debug, Clone)]
struct Preview {
    operations: Vec<PatchOperation>,
    preset_id: Option<PresetId>,
    theme: Value,
}

/// Committed theme plus an optional preview overlay and a linear undo history.
///
/// A preview is a JSON Patch held next to the committed theme. It is applied
/// eagerly so that a patch that does not fit is rejected up front; the
/// committed theme only changes through `commit_preview`, `apply_patch`,
/// `update_value`, `set_theme`, `undo` and `redo`.
///
/// Every fallible operation leaves the store unchanged on error and records
/// the message in `last_error`.
#[derive(Debug, Clone)]
pub struct ThemeStore {
    theme: Value,
    preview: Option<Preview>,
    active_theme_id: Option<ThemeId>,
    /// Theme the history starts from; undoing every entry returns here.
    base: Value,
    history: Vec<ThemePatch>,
    /// Number of history entries currently applied.
    cursor: usize,
    last_error: Option<String>,
}

impl ThemeStore {
    pub fn new(theme: Value) -> Self {
        Self {
            base: theme.clone(),
            theme,
            preview: None,
            active_theme_id: None,
            history: Vec::new(),
            cursor: 0,
            last_error: None,
        }
    }

    pub fn with_theme_id(mut self, theme_id: ThemeId) -> Self {
        self.active_theme_id = Some(theme_id);
        self
    }

    pub fn theme(&self) -> &Value {
        &self.theme
    }

    pub fn active_theme_id(&self) -> Option<ThemeId> {
        self.active_theme_id
    }

    pub fn set_active_theme_id(&mut self, theme_id: Option<ThemeId>) {
        debug!(?theme_id, "active theme id set");
        self.active_theme_id = theme_id;
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.last_error = error;
    }

    /// Preview theme when one is held, otherwise the committed theme.
    pub fn display_theme(&self) -> &Value {
        self.preview
            .as_ref()
            .map(|preview| &preview.theme)
            .unwrap_or(&self.theme)
    }

    pub fn has_preview(&self) -> bool {
        self.preview.is_some()
    }

    pub fn preview_operations(&self) -> Option<&[PatchOperation]> {
        self.preview.as_ref().map(|p| p.operations.as_slice())
    }

    /// Replaces the committed theme wholesale and records the difference in
    /// history. Returns `false` when nothing changed. A held preview is
    /// re-applied on top of the new theme and dropped if it no longer fits.
    pub fn set_theme(&mut self, theme: Value) -> bool {
        if theme == self.theme {
            debug!("theme unchanged, skipping update");
            return false;
        }
        let entry = ThemePatch::new(diff(&self.theme, &theme), "replace theme", "editor");
        self.push_history(entry, theme);
        self.rebase_preview();
        true
    }

    pub fn apply_preview_patch(&mut self, operations: Vec<PatchOperation>) -> Result<(), ThemeError> {
        self.preview_with(operations, None)
    }

    pub fn apply_preview_preset(
        &mut self,
        preset_id: PresetId,
        operations: Vec<PatchOperation>,
    ) -> Result<(), ThemeError> {
        self.preview_with(operations, Some(preset_id))
    }

    fn preview_with(
        &mut self,
        operations: Vec<PatchOperation>,
        preset_id: Option<PresetId>,
    ) -> Result<(), ThemeError> {
        let theme = self.record(apply_patch(&self.theme, &operations))?;
        debug!(ops = operations.len(), "preview patch applied");
        self.preview = Some(Preview {
            operations,
            preset_id,
            theme,
        });
        Ok(())
    }

    /// Folds the preview into the committed theme and records it in history.
    pub fn commit_preview(&mut self) -> Result<&ThemePatch, ThemeError> {
        let Some(preview) = self.preview.take() else {
            return Err(self.fail(ThemeError::NoPreview));
        };
        let mut entry = ThemePatch::new(preview.operations, "commit preview", "preview");
        entry.preset_id = preview.preset_id;
        Ok(self.push_history(entry, preview.theme))
    }

    pub fn clear_preview(&mut self) {
        self.preview = None;
    }

    /// Applies a patch straight to the committed theme. Redo history past the
    /// current position is discarded. A held preview is left in place and
    /// re-based like in `set_theme`.
    pub fn apply_patch(&mut self, patch: ThemePatch) -> Result<&ThemePatch, ThemeError> {
        let theme = self.record(apply_patch(&self.theme, &patch.operations))?;
        debug!(prompt = %patch.user_prompt, "patch applied");
        self.push_history(patch, theme);
        self.rebase_preview();
        Ok(&self.history[self.cursor - 1])
    }

    /// Sets a single value, creating intermediate objects along the way.
    pub fn update_value(&mut self, pointer: &str, value: Value) -> Result<&ThemePatch, ThemeError> {
        let mut theme = self.theme.clone();
        self.record(set_pointer(&mut theme, pointer, value))?;
        // Created parents and replaced scalars show up in the diff.
        let entry = ThemePatch::new(diff(&self.theme, &theme), "manual edit", "editor");
        self.push_history(entry, theme);
        self.rebase_preview();
        Ok(&self.history[self.cursor - 1])
    }

    fn push_history(&mut self, mut entry: ThemePatch, theme: Value) -> &ThemePatch {
        entry.theme = theme.clone();
        self.history.truncate(self.cursor);
        self.history.push(entry);
        if self.history.len() > MAX_HISTORY {
            let oldest = self.history.remove(0);
            self.base = oldest.theme;
        }
        self.cursor = self.history.len();
        self.theme = theme;
        self.last_error = None;
        &self.history[self.cursor - 1]
    }

    fn rebase_preview(&mut self) {
        if let Some(preview) = self.preview.take() {
            match apply_patch(&self.theme, &preview.operations) {
                Ok(theme) => self.preview = Some(Preview { theme, ..preview }),
                Err(error) => warn!(%error, "dropping preview that no longer applies"),
            }
        }
    }

    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.cursor -= 1;
        self.theme = match self.cursor {
            0 => self.base.clone(),
            n => self.history[n - 1].theme.clone(),
        };
        self.last_error = None;
        self.rebase_preview();
        debug!(cursor = self.cursor, "undo applied");
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.theme = self.history[self.cursor].theme.clone();
        self.cursor += 1;
        self.last_error = None;
        self.rebase_preview();
        debug!(cursor = self.cursor, "redo applied");
        true
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.history.len()
    }

    pub fn current_patch(&self) -> Option<&ThemePatch> {
        self.cursor.checked_sub(1).and_then(|i| self.history.get(i))
    }

    pub fn history(&self) -> &[ThemePatch] {
        &self.history
    }

    /// Forgets history; the current theme becomes the new base.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.cursor = 0;
        self.base = self.theme.clone();
        self.last_error = None;
    }

    fn record<T>(&mut self, result: Result<T, ThemeError>) -> Result<T, ThemeError> {
        result.map_err(|error| self.fail(error))
    }

    fn fail(&mut self, error: ThemeError) -> ThemeError {
        warn!(%error, "theme store operation failed");
        self.last_error = Some(error.to_string());
        error
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
