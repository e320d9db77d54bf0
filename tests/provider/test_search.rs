//! Search composer scenarios over the seeded blog index

use crate::common::{seeded_blog, BlogPost, BLOG_INDEX};
use chrono::{Duration, TimeZone, Utc};
use shelf::core::search::{Predicate, SortDirection, SortValueType};
use shelf::{QueryFilter, SearchResult};

fn ids(result: &SearchResult<BlogPost>) -> Vec<&str> {
    result.hits.iter().map(|h| h.hit.id.as_str()).collect()
}

#[tokio::test]
async fn test_get_all() {
    let ctx = seeded_blog().await;

    let result = ctx
        .services
        .provider
        .search()
        .list_result_for(BLOG_INDEX)
        .await
        .unwrap();

    assert_eq!(result.count, 10);
    assert_eq!(result.hits.len(), 10);
}

#[tokio::test]
async fn test_should_on_tag_id() {
    let ctx = seeded_blog().await;

    let result = ctx
        .services
        .provider
        .search()
        .should(Predicate::term("TagIds", "11"))
        .list_result::<BlogPost>()
        .await
        .unwrap();

    assert_eq!(result.count, 1);
    assert_eq!(ids(&result), vec!["10"]);
}

#[tokio::test]
async fn test_two_should_ids() {
    let ctx = seeded_blog().await;

    let result = ctx
        .services
        .provider
        .search()
        .should(Predicate::term("Id", "1"))
        .should(Predicate::term("Id", "2"))
        .list_result::<BlogPost>()
        .await
        .unwrap();

    assert_eq!(result.count, 2);
    let mut found = ids(&result);
    found.sort();
    assert_eq!(found, vec!["1", "2"]);
}

#[tokio::test]
async fn test_must_overrides_should() {
    let ctx = seeded_blog().await;

    // With a MUST present, SHOULD only affects scoring
    let result = ctx
        .services
        .provider
        .search()
        .must(Predicate::term("Id", "3"))
        .should(Predicate::term("Id", "4"))
        .list_result::<BlogPost>()
        .await
        .unwrap();

    assert_eq!(ids(&result), vec!["3"]);
}

#[tokio::test]
async fn test_must_not_alone_excludes() {
    let ctx = seeded_blog().await;

    let result = ctx
        .services
        .provider
        .search()
        .must_not(Predicate::term("Id", "5"))
        .list_result::<BlogPost>()
        .await
        .unwrap();

    assert_eq!(result.count, 9);
    assert!(!ids(&result).contains(&"5"));
}

#[tokio::test]
async fn test_single_result() {
    let ctx = seeded_blog().await;
    let provider = &ctx.services.provider;

    let found = provider
        .search()
        .must(Predicate::term("Id", "1"))
        .single_result::<BlogPost>()
        .await
        .unwrap();
    assert_eq!(found.hit.unwrap().id, "1");

    let missing = provider
        .search()
        .must(Predicate::term("Id", "100"))
        .single_result::<BlogPost>()
        .await
        .unwrap();
    assert!(missing.hit.is_none());
}

#[tokio::test]
async fn test_any() {
    let ctx = seeded_blog().await;
    let provider = &ctx.services.provider;

    assert!(provider
        .search()
        .must(Predicate::term("TagIds", "2"))
        .any::<BlogPost>()
        .await
        .unwrap());
    assert!(!provider
        .search()
        .must(Predicate::term("TagIds", "404"))
        .any::<BlogPost>()
        .await
        .unwrap());
}

#[tokio::test]
async fn test_sort_by_date() {
    let ctx = seeded_blog().await;
    let provider = &ctx.services.provider;

    let descending = provider
        .search()
        .sort_by("PublishedDate", SortDirection::Descending, SortValueType::Date)
        .list_result::<BlogPost>()
        .await
        .unwrap();
    assert_eq!(
        ids(&descending),
        vec!["1", "7", "8", "9", "10", "4", "6", "5", "2", "3"]
    );

    let ascending = provider
        .search()
        .sort_by("PublishedDate", SortDirection::Ascending, SortValueType::Date)
        .list_result::<BlogPost>()
        .await
        .unwrap();

    let mut reversed = ids(&descending);
    reversed.reverse();
    assert_eq!(ids(&ascending), reversed);
    assert_eq!(ascending.hits.first().unwrap().hit.id, "3");
    assert_eq!(ascending.hits.last().unwrap().hit.id, "1");
}

#[tokio::test]
async fn test_sort_numeric() {
    let ctx = seeded_blog().await;

    let result = ctx
        .services
        .provider
        .search()
        .sort_by("Views", SortDirection::Descending, SortValueType::Numeric)
        .list_result::<BlogPost>()
        .await
        .unwrap();

    let views: Vec<i64> = result.hits.iter().map(|h| h.hit.views).collect();
    let mut sorted = views.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(views, sorted);
}

#[tokio::test]
async fn test_paging_second_page() {
    let ctx = seeded_blog().await;
    let provider = &ctx.services.provider;

    let page = provider
        .search()
        .sort_by("PublishedDate", SortDirection::Descending, SortValueType::Date)
        .paged(2, 5)
        .list_result::<BlogPost>()
        .await
        .unwrap();

    assert_eq!(page.count, 10);
    assert_eq!(ids(&page), vec!["4", "6", "5", "2", "3"]);
}

#[tokio::test]
async fn test_pages_are_contiguous() {
    let ctx = seeded_blog().await;
    let provider = &ctx.services.provider;

    let mut seen = Vec::new();
    for page in 1..=4 {
        let result = provider
            .search()
            .paged(page, 3)
            .list_result::<BlogPost>()
            .await
            .unwrap();

        let expected = if page == 4 { 1 } else { 3 };
        assert_eq!(result.hits.len(), expected);
        seen.extend(result.hits.into_iter().map(|h| h.hit.id));
    }

    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 10);

    let beyond = provider
        .search()
        .paged(5, 3)
        .list_result::<BlogPost>()
        .await
        .unwrap();
    assert!(beyond.hits.is_empty());
    assert_eq!(beyond.count, 10);
}

#[tokio::test]
async fn test_phrase_on_body() {
    let ctx = seeded_blog().await;

    let result = ctx
        .services
        .provider
        .search()
        .must(Predicate::phrase("Body", "My test body"))
        .list_result::<BlogPost>()
        .await
        .unwrap();

    assert_eq!(ids(&result), vec!["9"]);
}

#[tokio::test]
async fn test_fuzzy_on_body() {
    let ctx = seeded_blog().await;

    let result = ctx
        .services
        .provider
        .search()
        .must(Predicate::fuzzy("Body", "tests", 1))
        .list_result::<BlogPost>()
        .await
        .unwrap();

    assert_eq!(ids(&result), vec!["9"]);
}

#[tokio::test]
async fn test_nested_property() {
    let ctx = seeded_blog().await;

    let result = ctx
        .services
        .provider
        .search()
        .must(Predicate::term("Tags.Name", "my-test-tag"))
        .list_result::<BlogPost>()
        .await
        .unwrap();

    assert_eq!(ids(&result), vec!["9"]);
}

#[tokio::test]
async fn test_date_range() {
    let ctx = seeded_blog().await;
    let upper = Utc.with_ymd_and_hms(2023, 8, 22, 6, 0, 0).unwrap();
    let lower = upper - Duration::days(10);

    let result = ctx
        .services
        .provider
        .search()
        .must(Predicate::between("PublishedDate", lower, upper))
        .list_result::<BlogPost>()
        .await
        .unwrap();

    // Posts 1, 7, 8, 9 and 10 fall inside the last ten days
    assert_eq!(result.count, 5);
}

#[tokio::test]
async fn test_nested_boolean_level() {
    let ctx = seeded_blog().await;

    let result = ctx
        .services
        .provider
        .search()
        .must(Predicate::boolean(vec![
            QueryFilter::should(Predicate::term("Id", "1")),
            QueryFilter::should(Predicate::term("Id", "2")),
            QueryFilter::should(Predicate::term("Id", "3")),
        ]))
        .must_not(Predicate::term("Id", "2"))
        .list_result::<BlogPost>()
        .await
        .unwrap();

    let mut found = ids(&result);
    found.sort();
    assert_eq!(found, vec!["1", "3"]);
}

#[tokio::test]
async fn test_invalid_query_degrades_to_empty() {
    let ctx = seeded_blog().await;

    let result = ctx
        .services
        .provider
        .search()
        .must(Predicate::term("NoSuchField", "x"))
        .list_result::<BlogPost>()
        .await
        .unwrap();

    assert!(result.hits.is_empty());
    assert_eq!(result.count, 0);
}

#[tokio::test]
async fn test_unconfigured_index_propagates() {
    let ctx = seeded_blog().await;

    let err = ctx
        .services
        .provider
        .search()
        .list_result_for("Unknown")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}
