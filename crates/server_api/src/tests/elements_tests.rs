use super::*;
use shared::error::ErrorCode;
use storage::Storage;

async fn seeded() -> ApiContext {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let ctx = ApiContext::new(storage, std::env::temp_dir());
    let seeded = seed_elements(&ctx).await.expect("seed");
    assert_eq!(seeded.count, 19);
    ctx
}

#[tokio::test]
async fn groups_every_screen() {
    let ctx = seeded().await;
    let groups = grouped_by_screen(&ctx).await.expect("groups");
    let total: usize = groups.iter().map(|g| g.counts.total).sum();
    assert_eq!(total, 19);

    let home = by_screen(&ctx, "home").await.expect("home");
    assert_eq!(home.count, home.elements.len());
    assert!(home.customizable_count < home.count);

    assert_eq!(customizable(&ctx).await.expect("customizable").len(), 18);
}

#[tokio::test]
async fn statistics_cover_catalog() {
    let ctx = seeded().await;
    let stats = statistics(&ctx).await.expect("stats");
    assert_eq!(stats.total, 19);
    assert_eq!(stats.customizable, 18);
    assert_eq!(stats.screens.len(), 5);
}

#[tokio::test]
async fn empty_search_is_rejected() {
    let ctx = seeded().await;
    let err = search(&ctx, "  ").await.expect_err("empty");
    assert_eq!(err.code, ErrorCode::Validation);
    assert!(!search(&ctx, "balance").await.expect("search").is_empty());
}

#[tokio::test]
async fn mapping_a_path_raises_coverage() {
    let ctx = seeded().await;
    let before = mapping_stats(&ctx).await.expect("stats");
    assert_eq!(before.total, 18);
    assert_eq!(before.mapped, 15);

    let event = update_path(&ctx, "action-buy", "/homeLayer/actionButtons/buyButton/containerColor")
        .await
        .expect("update");
    assert!(matches!(event, ThemeEvent::ElementPathUpdated { ref element_id, .. } if element_id == "action-buy"));

    let after = mapping_stats(&ctx).await.expect("stats");
    assert_eq!(after.mapped, 16);
    let context = element_context(&ctx, "action-buy").await.expect("context");
    assert_eq!(context.json_path, "/homeLayer/actionButtons/buyButton/containerColor");
    assert!(context_text(&ctx).await.expect("text").contains("action-buy"));
}

#[tokio::test]
async fn path_updates_are_validated() {
    let ctx = seeded().await;
    let bad = update_path(&ctx, "action-buy", "homeLayer").await.expect_err("bad path");
    assert_eq!(bad.code, ErrorCode::Validation);

    let missing = update_path(&ctx, "ghost", "/homeLayer").await.expect_err("missing");
    assert_eq!(missing.code, ErrorCode::NotFound);

    let unmapped = element_context(&ctx, "home-balance-change")
        .await
        .expect_err("unmapped");
    assert_eq!(unmapped.code, ErrorCode::NotFound);
}
