//! Command handlers against a real index root

use crate::common::{blog_posts, create_test_services, seeded_blog, BlogPost, BLOG_INDEX, BLOG_TEMP_INDEX};
use shelf::cli::commands::document::{execute_get, execute_store, GetArgs, StoreArgs};
use shelf::cli::commands::index::{execute_create, execute_swap, CreateArgs, SwapArgs};
use shelf::cli::commands::{config, health, search, ConfigArgs, HealthArgs, SearchArgs};
use shelf::cli::OutputFormat;

fn search_args(index: &str) -> SearchArgs {
    SearchArgs {
        index: index.to_string(),
        must: Vec::new(),
        should: Vec::new(),
        must_not: Vec::new(),
        sort: Vec::new(),
        page: None,
        page_size: None,
    }
}

#[tokio::test]
async fn test_create_store_and_get() {
    let ctx = create_test_services();
    let file = ctx.dir.path().join("posts.json");
    std::fs::write(&file, serde_json::to_string(&blog_posts()).unwrap()).unwrap();

    execute_create(
        CreateArgs {
            index: BLOG_INDEX.to_string(),
        },
        &ctx.services,
        OutputFormat::Json,
    )
    .await
    .unwrap();

    execute_store(
        StoreArgs {
            index: BLOG_INDEX.to_string(),
            file,
        },
        &ctx.services,
        OutputFormat::Json,
    )
    .await
    .unwrap();
    ctx.services.provider.commit(BLOG_INDEX).await.unwrap();

    let stored = ctx
        .services
        .provider
        .get_by_id::<BlogPost>("10")
        .await
        .unwrap();
    assert!(stored.is_found());

    execute_get(
        GetArgs {
            index: BLOG_INDEX.to_string(),
            id: "10".to_string(),
        },
        &ctx.services,
        OutputFormat::Human,
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_search_with_filters_and_sort() {
    let ctx = seeded_blog().await;

    let mut args = search_args(BLOG_INDEX);
    args.must = vec!["TagIds=11".to_string()];
    args.sort = vec!["PublishedDate:desc".to_string()];
    args.page = Some(1);
    args.page_size = Some(5);

    search::execute(args, &ctx.services, OutputFormat::Json)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_search_rejects_malformed_filter() {
    let ctx = seeded_blog().await;

    let mut args = search_args(BLOG_INDEX);
    args.must = vec!["Views=lots".to_string()];

    assert!(search::execute(args, &ctx.services, OutputFormat::Human)
        .await
        .is_err());
}

#[tokio::test]
async fn test_search_unconfigured_index() {
    let ctx = create_test_services();
    assert!(
        search::execute(search_args("Unknown"), &ctx.services, OutputFormat::Json)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_swap_without_source_is_an_error() {
    let ctx = seeded_blog().await;

    let result = execute_swap(
        SwapArgs {
            temp: BLOG_TEMP_INDEX.to_string(),
            target: BLOG_INDEX.to_string(),
        },
        &ctx.services,
        OutputFormat::Json,
    )
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_check_health_and_show_config() {
    let ctx = seeded_blog().await;

    health::execute(
        HealthArgs {
            index: BLOG_INDEX.to_string(),
        },
        &ctx.services,
        OutputFormat::Human,
    )
    .await
    .unwrap();

    config::execute(ConfigArgs { all: true }, &ctx.services, OutputFormat::Human)
        .await
        .unwrap();
}
