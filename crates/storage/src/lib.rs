use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{
    domain::{NewPreset, PresetId, PresetRecord, ThemeId, ThemeRecord, WalletElement},
    protocol::ElementFilter,
};

pub const SEARCH_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("failed to encode json column")
}

fn from_json<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<T> {
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw).with_context(|| format!("corrupt json in column '{column}'"))
}

fn theme_from_row(row: &SqliteRow) -> Result<ThemeRecord> {
    Ok(ThemeRecord {
        theme_id: ThemeId(row.try_get("id")?),
        name: row.try_get("name")?,
        base_theme: from_json(row, "base_theme")?,
        current_theme: from_json(row, "current_theme")?,
        version: row.try_get("version")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn preset_from_row(row: &SqliteRow) -> Result<PresetRecord> {
    Ok(PresetRecord {
        preset_id: PresetId(row.try_get("id")?),
        title: row.try_get("title")?,
        tags: from_json(row, "tags")?,
        cover_url: row.try_get("cover_url")?,
        sample_patch: from_json(row, "sample_patch")?,
        sample_context: row.try_get("sample_context")?,
        palette: from_json(row, "palette")?,
    })
}

fn element_from_row(row: &SqliteRow) -> Result<WalletElement> {
    Ok(WalletElement {
        id: row.try_get("id")?,
        screen: row.try_get("screen")?,
        name: row.try_get("name")?,
        kind: row.try_get("type")?,
        description: row.try_get("description")?,
        customizable: row.try_get("customizable")?,
        custom_props: from_json(row, "custom_props")?,
        position: row.try_get("position")?,
        selector: row.try_get("selector")?,
        json_path: row.try_get("json_path")?,
    })
}

const ELEMENT_COLUMNS: &str =
    "id, screen, name, type, description, customizable, custom_props, position, selector, json_path";

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // every in-memory connection is its own database
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn create_theme(&self, name: &str, base_theme: &Value) -> Result<ThemeRecord> {
        let encoded = to_json(base_theme)?;
        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO themes (name, base_theme, current_theme, version, created_at, updated_at)
             VALUES (?, ?, ?, 1, ?, ?)
             RETURNING id, name, base_theme, current_theme, version, created_at, updated_at",
        )
        .bind(name)
        .bind(&encoded)
        .bind(&encoded)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert theme")?;
        theme_from_row(&row)
    }

    pub async fn load_theme(&self, theme_id: ThemeId) -> Result<Option<ThemeRecord>> {
        let row = sqlx::query(
            "SELECT id, name, base_theme, current_theme, version, created_at, updated_at
             FROM themes WHERE id = ?",
        )
        .bind(theme_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(theme_from_row).transpose()
    }

    pub async fn list_themes(&self) -> Result<Vec<ThemeRecord>> {
        let rows = sqlx::query(
            "SELECT id, name, base_theme, current_theme, version, created_at, updated_at
             FROM themes ORDER BY updated_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(theme_from_row).collect()
    }

    /// Stores `theme` as the current document and returns the bumped version.
    pub async fn update_current_theme(&self, theme_id: ThemeId, theme: &Value) -> Result<i64> {
        let version = sqlx::query_scalar::<_, i64>(
            "UPDATE themes SET current_theme = ?, version = version + 1, updated_at = ?
             WHERE id = ? RETURNING version",
        )
        .bind(to_json(theme)?)
        .bind(Utc::now())
        .bind(theme_id.0)
        .fetch_optional(&self.pool)
        .await?;
        version.ok_or_else(|| anyhow!("theme {} not found", theme_id.0))
    }

    /// Inserts a preset unless one with the same title exists; returns the new id
    /// or `None` when skipped.
    pub async fn insert_preset(&self, preset: &NewPreset) -> Result<Option<PresetId>> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO presets (title, tags, cover_url, sample_patch, sample_context, palette, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(title) DO NOTHING
             RETURNING id",
        )
        .bind(&preset.title)
        .bind(to_json(&preset.tags)?)
        .bind(&preset.cover_url)
        .bind(to_json(&preset.sample_patch)?)
        .bind(&preset.sample_context)
        .bind(to_json(&preset.palette)?)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to insert preset '{}'", preset.title))?;
        Ok(id.map(PresetId))
    }

    pub async fn list_presets(&self) -> Result<Vec<PresetRecord>> {
        let rows = sqlx::query(
            "SELECT id, title, tags, cover_url, sample_patch, sample_context, palette
             FROM presets ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(preset_from_row).collect()
    }

    pub async fn load_preset(&self, preset_id: PresetId) -> Result<Option<PresetRecord>> {
        let row = sqlx::query(
            "SELECT id, title, tags, cover_url, sample_patch, sample_context, palette
             FROM presets WHERE id = ?",
        )
        .bind(preset_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(preset_from_row).transpose()
    }

    /// Inserts or refreshes catalog rows. An existing `json_path` is kept when
    /// the incoming element carries none.
    pub async fn upsert_wallet_elements(&self, elements: &[WalletElement]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        for element in elements {
            sqlx::query(
                "INSERT INTO wallet_elements
                    (id, screen, name, type, description, customizable, custom_props, position, selector, json_path, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    screen = excluded.screen,
                    name = excluded.name,
                    type = excluded.type,
                    description = excluded.description,
                    customizable = excluded.customizable,
                    custom_props = excluded.custom_props,
                    position = excluded.position,
                    selector = excluded.selector,
                    json_path = COALESCE(excluded.json_path, wallet_elements.json_path),
                    updated_at = excluded.updated_at",
            )
            .bind(&element.id)
            .bind(&element.screen)
            .bind(&element.name)
            .bind(&element.kind)
            .bind(&element.description)
            .bind(element.customizable)
            .bind(to_json(&element.custom_props)?)
            .bind(&element.position)
            .bind(&element.selector)
            .bind(&element.json_path)
            .bind(now)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to upsert wallet element '{}'", element.id))?;
        }
        tx.commit().await?;
        Ok(elements.len())
    }

    /// Elements matching every set field of `filter`, ordered by screen,
    /// position and name.
    pub async fn list_elements(&self, filter: &ElementFilter) -> Result<Vec<WalletElement>> {
        let rows = sqlx::query(&format!(
            "SELECT {ELEMENT_COLUMNS} FROM wallet_elements
             WHERE (?1 IS NULL OR screen = ?1)
               AND (?2 IS NULL OR type = ?2)
               AND (?3 IS NULL OR customizable = ?3)
             ORDER BY screen, position, name"
        ))
        .bind(&filter.screen)
        .bind(&filter.kind)
        .bind(filter.customizable)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(element_from_row).collect()
    }

    pub async fn load_element(&self, element_id: &str) -> Result<Option<WalletElement>> {
        let row = sqlx::query(&format!(
            "SELECT {ELEMENT_COLUMNS} FROM wallet_elements WHERE id = ?"
        ))
        .bind(element_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(element_from_row).transpose()
    }

    /// Case-insensitive match on name or description among customizable elements.
    pub async fn search_elements(&self, query: &str) -> Result<Vec<WalletElement>> {
        let pattern = format!("%{}%", query.trim().to_lowercase());
        let rows = sqlx::query(&format!(
            "SELECT {ELEMENT_COLUMNS} FROM wallet_elements
             WHERE customizable = 1
               AND (lower(name) LIKE ?1 OR lower(description) LIKE ?1)
             ORDER BY screen, name
             LIMIT ?2"
        ))
        .bind(pattern)
        .bind(SEARCH_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(element_from_row).collect()
    }

    /// Returns false when no element has `element_id`.
    pub async fn update_element_path(&self, element_id: &str, json_path: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE wallet_elements SET json_path = ?, updated_at = ? WHERE id = ?",
        )
        .bind(json_path)
        .bind(Utc::now())
        .bind(element_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
