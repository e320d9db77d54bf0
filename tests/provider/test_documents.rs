//! Store, get, update and delete through the provider

use crate::common::fixtures::post;
use crate::common::{create_test_services, seeded_blog, BlogPost, BLOG_INDEX};
use serde_json::json;
use shelf::core::search::Predicate;

#[tokio::test]
async fn test_store_then_get_by_id() {
    let ctx = seeded_blog().await;

    let found = ctx
        .services
        .provider
        .get_by_id::<BlogPost>("8")
        .await
        .unwrap();
    assert!(found.is_found());
    assert_eq!(found.hit.unwrap().id, "8");

    let missing = ctx
        .services
        .provider
        .get_by_id::<BlogPost>("13")
        .await
        .unwrap();
    assert!(missing.hit.is_none());
}

#[tokio::test]
async fn test_round_trip_preserves_item() {
    let ctx = seeded_blog().await;

    let stored = crate::common::blog_posts()
        .into_iter()
        .find(|p| p.id == "9")
        .unwrap();
    let loaded = ctx
        .services
        .provider
        .get_by_id::<BlogPost>("9")
        .await
        .unwrap()
        .hit
        .unwrap();

    assert_eq!(loaded, stored);
}

#[tokio::test]
async fn test_writes_invisible_until_commit() {
    let ctx = seeded_blog().await;
    let provider = &ctx.services.provider;

    provider
        .store_entities(&[post("11", 2)])
        .await
        .unwrap();
    assert!(!provider.get_by_id::<BlogPost>("11").await.unwrap().is_found());

    provider.commit(BLOG_INDEX).await.unwrap();
    assert!(provider.get_by_id::<BlogPost>("11").await.unwrap().is_found());
}

#[tokio::test]
async fn test_store_skips_unmappable_items() {
    let ctx = create_test_services();
    let provider = &ctx.services.provider;
    provider.create_index_if_not_exists(BLOG_INDEX).await.unwrap();

    let items = vec![
        json!({"Id": "1", "Name": "kept"}),
        json!({"Name": "no key"}),
        json!("not an object"),
        json!({"Id": "2", "Views": "many"}),
        json!({"Id": "3", "Name": "also kept"}),
    ];

    let stored = provider.store(items, BLOG_INDEX).await.unwrap();
    assert_eq!(stored, 2);

    provider.commit(BLOG_INDEX).await.unwrap();
    let result = provider.search().list_result_for(BLOG_INDEX).await.unwrap();
    assert_eq!(result.count, 2);
}

#[tokio::test]
async fn test_store_empty_batch() {
    let ctx = create_test_services();
    let stored = ctx
        .services
        .provider
        .store(Vec::new(), BLOG_INDEX)
        .await
        .unwrap();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn test_update_replaces_document() {
    let ctx = seeded_blog().await;
    let provider = &ctx.services.provider;

    let mut changed = post("4", 11);
    changed.name = "Rewritten".to_string();
    assert!(provider.update(&changed, "4").await.unwrap());
    provider.commit(BLOG_INDEX).await.unwrap();

    let loaded = provider.get_by_id::<BlogPost>("4").await.unwrap().hit.unwrap();
    assert_eq!(loaded.name, "Rewritten");

    // Replaced, not duplicated
    let all = provider.search().list_result_for(BLOG_INDEX).await.unwrap();
    assert_eq!(all.count, 10);
}

#[tokio::test]
async fn test_update_reports_mapping_failure() {
    let ctx = seeded_blog().await;

    let updated = ctx
        .services
        .provider
        .update_value(BLOG_INDEX, json!({"Name": "missing key"}), "4")
        .await
        .unwrap();

    assert!(!updated);
}

#[tokio::test]
async fn test_update_all() {
    let ctx = seeded_blog().await;
    let provider = &ctx.services.provider;

    let mut first = post("1", 1);
    first.views = 5000;
    let mut second = post("2", 100);
    second.views = 6000;

    assert!(provider.update_all(&[first, second]).await.unwrap());
    provider.commit(BLOG_INDEX).await.unwrap();

    let hits = provider
        .search()
        .must(Predicate::between("Views", 5000i64, 6000i64))
        .list_result::<BlogPost>()
        .await
        .unwrap();
    assert_eq!(hits.count, 2);
}

#[tokio::test]
async fn test_delete_by_id() {
    let ctx = seeded_blog().await;
    let provider = &ctx.services.provider;

    provider.delete_entity::<BlogPost>("5").await.unwrap();
    provider.commit(BLOG_INDEX).await.unwrap();

    assert!(!provider.get_by_id::<BlogPost>("5").await.unwrap().is_found());
    let all = provider.search().list_result_for(BLOG_INDEX).await.unwrap();
    assert_eq!(all.count, 9);
}

#[tokio::test]
async fn test_delete_on_unconfigured_index_fails() {
    let ctx = create_test_services();
    let err = ctx.services.provider.delete("Unknown", "1").await.unwrap_err();
    assert!(err.is_not_found());
}
