//! Index lifecycle: create, delete, swap and health checks

use crate::common::fixtures::post;
use crate::common::{create_test_services, seeded_blog, BlogPost, BLOG_INDEX, BLOG_TEMP_INDEX};
use serde_json::Value;
use std::fs;

#[tokio::test]
async fn test_create_is_idempotent() {
    let ctx = create_test_services();
    let provider = &ctx.services.provider;

    provider.create_index_for::<BlogPost>().await.unwrap();
    provider.create_index_for::<BlogPost>().await.unwrap();

    let path = provider.directories().path(BLOG_INDEX).unwrap();
    assert!(path.join("meta.json").is_file());

    let result = provider.search().list_result_for(BLOG_INDEX).await.unwrap();
    assert_eq!(result.count, 0);
}

#[tokio::test]
async fn test_create_keeps_existing_documents() {
    let ctx = seeded_blog().await;
    let provider = &ctx.services.provider;

    provider.create_index_if_not_exists(BLOG_INDEX).await.unwrap();
    let result = provider.search().list_result_for(BLOG_INDEX).await.unwrap();
    assert_eq!(result.count, 10);
}

#[tokio::test]
async fn test_create_unconfigured_index_fails() {
    let ctx = create_test_services();
    let err = ctx
        .services
        .provider
        .create_index_if_not_exists("Unknown")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_invalid_index_name_is_rejected() {
    let ctx = create_test_services();
    let err = ctx
        .services
        .provider
        .delete_index("../escape")
        .await
        .unwrap_err();
    assert!(err.is_bad_request());
}

#[tokio::test]
async fn test_delete_index_removes_files() {
    let ctx = seeded_blog().await;
    let provider = &ctx.services.provider;
    let path = provider.directories().path(BLOG_INDEX).unwrap();

    provider.delete_index(BLOG_INDEX).await.unwrap();

    assert!(!path.exists());
    assert!(!provider.sessions().has_session(BLOG_INDEX));
    assert!(!provider.directories().is_cached(BLOG_INDEX));

    // Next use starts from an empty index
    let result = provider.search().list_result_for(BLOG_INDEX).await.unwrap();
    assert_eq!(result.count, 0);
}

#[tokio::test]
async fn test_delete_missing_index_is_noop() {
    let ctx = create_test_services();
    ctx.services
        .provider
        .delete_index(BLOG_TEMP_INDEX)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_swap_replaces_target() {
    let ctx = seeded_blog().await;
    let provider = &ctx.services.provider;

    // Rebuild into the temp index
    provider.create_index_if_not_exists(BLOG_TEMP_INDEX).await.unwrap();
    let rebuilt: Vec<Value> = ["21", "22", "23"]
        .iter()
        .map(|id| serde_json::to_value(post(id, 1)).unwrap())
        .collect();
    assert_eq!(provider.store(rebuilt, BLOG_TEMP_INDEX).await.unwrap(), 3);
    provider.commit(BLOG_TEMP_INDEX).await.unwrap();

    assert!(provider.swap_index(BLOG_TEMP_INDEX, BLOG_INDEX).await.unwrap());

    let temp_path = provider.directories().path(BLOG_TEMP_INDEX).unwrap();
    assert!(!temp_path.exists());

    let result = provider.search().list_result::<BlogPost>().await.unwrap();
    assert_eq!(result.count, 3);
    assert!(provider.get_by_id::<BlogPost>("22").await.unwrap().is_found());
    assert!(!provider.get_by_id::<BlogPost>("1").await.unwrap().is_found());
}

#[tokio::test]
async fn test_swap_flushes_uncommitted_temp_writes() {
    let ctx = seeded_blog().await;
    let provider = &ctx.services.provider;

    provider.create_index_if_not_exists(BLOG_TEMP_INDEX).await.unwrap();
    let item = serde_json::to_value(post("31", 1)).unwrap();
    provider.store(vec![item], BLOG_TEMP_INDEX).await.unwrap();

    // Closing the temp session during the swap commits it
    assert!(provider.swap_index(BLOG_TEMP_INDEX, BLOG_INDEX).await.unwrap());
    assert!(provider.get_by_id::<BlogPost>("31").await.unwrap().is_found());
}

#[tokio::test]
async fn test_swap_missing_source_fails() {
    let ctx = seeded_blog().await;
    let provider = &ctx.services.provider;

    let swapped = provider
        .swap_index(BLOG_TEMP_INDEX, BLOG_INDEX)
        .await
        .unwrap();

    assert!(!swapped);
    let result = provider.search().list_result_for(BLOG_INDEX).await.unwrap();
    assert_eq!(result.count, 10);
}

#[tokio::test]
async fn test_swap_onto_itself_is_refused() {
    let ctx = seeded_blog().await;
    let provider = &ctx.services.provider;

    let swapped = provider.swap_index(BLOG_INDEX, BLOG_INDEX).await.unwrap();

    assert!(!swapped);
    assert!(provider.directories().path(BLOG_INDEX).unwrap().is_dir());
    let result = provider.search().list_result_for(BLOG_INDEX).await.unwrap();
    assert_eq!(result.count, 10);
}

#[tokio::test]
async fn test_check_health() {
    let ctx = seeded_blog().await;
    let provider = &ctx.services.provider;

    assert!(provider.check_health::<BlogPost>().await.unwrap());

    let report = provider.health_report(BLOG_INDEX).await.unwrap();
    assert!(report.is_consistent);
    assert_eq!(report.documents, 10);
    assert!(report.size_bytes > 0);
}

#[tokio::test]
async fn test_check_health_of_missing_index() {
    let ctx = create_test_services();
    let provider = &ctx.services.provider;

    assert!(!provider.check_health_of(BLOG_TEMP_INDEX).await.unwrap());
    assert!(provider.check_health_of("Unknown").await.is_err());
}

#[tokio::test]
async fn test_health_report_of_missing_index_is_not_found() {
    let ctx = create_test_services();
    let err = ctx
        .services
        .provider
        .health_report(BLOG_INDEX)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_corrupted_index_is_unhealthy_and_leaves_no_copy() {
    let ctx = seeded_blog().await;
    let provider = &ctx.services.provider;
    provider.shutdown().await;

    let live = provider.directories().path(BLOG_INDEX).unwrap();
    let segment_file = fs::read_dir(&live)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| p.extension().is_some_and(|ext| ext == "idx"))
        .unwrap();
    fs::write(&segment_file, b"garbage").unwrap();

    assert!(!provider.check_health::<BlogPost>().await.unwrap());

    let remaining: Vec<String> = fs::read_dir(provider.directories().root())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(remaining, vec![BLOG_INDEX.to_string()]);
}
