use std::{collections::HashMap, path::PathBuf, sync::Arc};

use shared::{
    domain::ThemeId,
    error::{ApiError, ErrorCode},
    protocol::ThemeView,
};
use storage::Storage;
use theme_engine::{ThemeError, ThemeStore};
use tokio::sync::Mutex;

pub mod elements;
pub mod presets;
pub mod themes;

/// Live editing state of one persisted theme.
pub struct Session {
    pub name: String,
    pub version: i64,
    pub store: ThemeStore,
}

impl Session {
    pub fn view(&self, theme_id: ThemeId) -> ThemeView {
        ThemeView {
            theme_id,
            name: self.name.clone(),
            version: self.version,
            theme: self.store.theme().clone(),
            display_theme: self.store.display_theme().clone(),
            has_preview: self.store.has_preview(),
            can_undo: self.store.can_undo(),
            can_redo: self.store.can_redo(),
            current_patch: self.store.current_patch().cloned(),
            last_error: self.store.last_error().map(str::to_string),
        }
    }
}

/// Shared handle to one session; each theme is locked on its own.
pub type SessionHandle = Arc<Mutex<Session>>;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub export_dir: PathBuf,
    sessions: Arc<Mutex<HashMap<ThemeId, SessionHandle>>>,
}

impl ApiContext {
    pub fn new(storage: Storage, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            export_dir: export_dir.into(),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the session for `theme_id`, loading it from storage on first
    /// use. The map lock is never held across a storage call.
    async fn session(&self, theme_id: ThemeId) -> Result<SessionHandle, ApiError> {
        if let Some(handle) = self.sessions.lock().await.get(&theme_id) {
            return Ok(handle.clone());
        }

        let record = self
            .storage
            .load_theme(theme_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| theme_not_found(theme_id))?;

        let mut sessions = self.sessions.lock().await;
        let handle = sessions.entry(theme_id).or_insert_with(|| {
            tracing::debug!(theme_id = theme_id.0, version = record.version, "theme session opened");
            Arc::new(Mutex::new(Session {
                name: record.name,
                version: record.version,
                store: ThemeStore::new(record.current_theme).with_theme_id(theme_id),
            }))
        });
        Ok(handle.clone())
    }
}

fn theme_not_found(theme_id: ThemeId) -> ApiError {
    ApiError::not_found(format!("theme {} not found", theme_id.0))
}

fn theme_error(err: ThemeError) -> ApiError {
    let code = match err {
        ThemeError::NoPreview => ErrorCode::Conflict,
        _ => ErrorCode::Validation,
    };
    ApiError::new(code, err.to_string())
}

fn internal(err: anyhow::Error) -> ApiError {
    tracing::error!(error = %err, "internal error");
    ApiError::new(ErrorCode::Internal, err.to_string())
}
