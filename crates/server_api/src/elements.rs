use shared::{
    domain::WalletElement,
    error::ApiError,
    protocol::{
        ElementFilter, ElementStatistics, MappingStats, ScreenElements, ScreenGroup, SeedResponse,
        ThemeEvent,
    },
};
use theme_engine::elements::{self, ElementContext};
use tracing::info;

use crate::{internal, ApiContext};

async fn all(ctx: &ApiContext) -> Result<Vec<WalletElement>, ApiError> {
    list_elements(ctx, &ElementFilter::default()).await
}

pub async fn list_elements(
    ctx: &ApiContext,
    filter: &ElementFilter,
) -> Result<Vec<WalletElement>, ApiError> {
    ctx.storage.list_elements(filter).await.map_err(internal)
}

pub async fn grouped_by_screen(ctx: &ApiContext) -> Result<Vec<ScreenGroup>, ApiError> {
    Ok(elements::group_by_screen(&all(ctx).await?))
}

pub async fn by_screen(ctx: &ApiContext, screen: &str) -> Result<ScreenElements, ApiError> {
    let filter = ElementFilter {
        screen: Some(screen.to_string()),
        ..Default::default()
    };
    Ok(elements::by_screen(&list_elements(ctx, &filter).await?, screen))
}

pub async fn customizable(ctx: &ApiContext) -> Result<Vec<WalletElement>, ApiError> {
    let filter = ElementFilter {
        customizable: Some(true),
        ..Default::default()
    };
    list_elements(ctx, &filter).await
}

pub async fn statistics(ctx: &ApiContext) -> Result<ElementStatistics, ApiError> {
    Ok(elements::statistics(&all(ctx).await?))
}

pub async fn search(ctx: &ApiContext, query: &str) -> Result<Vec<WalletElement>, ApiError> {
    if query.trim().is_empty() {
        return Err(ApiError::validation("search query must not be empty"));
    }
    ctx.storage.search_elements(query).await.map_err(internal)
}

pub async fn mapped(ctx: &ApiContext) -> Result<Vec<WalletElement>, ApiError> {
    Ok(elements::mapped_elements(&all(ctx).await?))
}

pub async fn mapping_stats(ctx: &ApiContext) -> Result<MappingStats, ApiError> {
    Ok(elements::mapping_stats(&all(ctx).await?))
}

/// Markdown registry of the mapped elements, for prompt building.
pub async fn context_text(ctx: &ApiContext) -> Result<String, ApiError> {
    Ok(elements::format_element_context(&mapped(ctx).await?))
}

pub async fn element_context(ctx: &ApiContext, element_id: &str) -> Result<ElementContext, ApiError> {
    let element = ctx
        .storage
        .load_element(element_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found(format!("element '{element_id}' not found")))?;
    elements::element_context(&element)
        .ok_or_else(|| ApiError::not_found(format!("element '{element_id}' has no json path")))
}

pub async fn update_path(
    ctx: &ApiContext,
    element_id: &str,
    json_path: &str,
) -> Result<ThemeEvent, ApiError> {
    let json_path = json_path.trim();
    if !json_path.starts_with('/') || json_path.len() < 2 {
        return Err(ApiError::validation("json path must be a JSON pointer like /homeLayer"));
    }
    let updated = ctx
        .storage
        .update_element_path(element_id, json_path)
        .await
        .map_err(internal)?;
    if !updated {
        return Err(ApiError::not_found(format!("element '{element_id}' not found")));
    }
    info!(element_id, json_path, "element path updated");
    Ok(ThemeEvent::ElementPathUpdated {
        element_id: element_id.to_string(),
        json_path: json_path.to_string(),
    })
}

pub async fn seed_elements(ctx: &ApiContext) -> Result<SeedResponse, ApiError> {
    let catalog = theme_engine::builtin_wallet_elements();
    let inserted = ctx
        .storage
        .upsert_wallet_elements(&catalog)
        .await
        .map_err(internal)?;
    info!(count = catalog.len(), "wallet elements seeded");
    Ok(SeedResponse {
        count: catalog.len(),
        inserted,
    })
}

#[cfg(test)]
#[path = "tests/elements_tests.rs"]
mod tests;
