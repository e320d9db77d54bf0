//! Session sharing, exclusive gates and units of work

use crate::common::fixtures::post;
use crate::common::helpers::create_test_services_with_timeout;
use crate::common::{create_test_services, seeded_blog, BlogPost, BLOG_INDEX};
use shelf::ScopeEnd;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_shares_one_session() {
    let ctx = create_test_services();
    let sessions = Arc::clone(ctx.services.provider.sessions());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let sessions = Arc::clone(&sessions);
            tokio::spawn(async move { sessions.session(BLOG_INDEX).await.unwrap() })
        })
        .collect();

    let mut opened = Vec::new();
    for handle in handles {
        opened.push(handle.await.unwrap());
    }

    let first = &opened[0];
    assert!(opened.iter().all(|s| Arc::ptr_eq(s, first)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_share_the_index() {
    let ctx = create_test_services();
    let provider = Arc::clone(&ctx.services.provider);
    provider.create_index_for::<BlogPost>().await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move {
                provider
                    .store_entities(&[post(&format!("w{i}"), i)])
                    .await
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), 1);
    }

    provider.commit(BLOG_INDEX).await.unwrap();
    let result = provider.search().list_result_for(BLOG_INDEX).await.unwrap();
    assert_eq!(result.count, 8);
}

#[tokio::test]
async fn test_gate_times_out_after_configured_bound() {
    let ctx = create_test_services_with_timeout(Duration::from_millis(1000));
    let sessions = ctx.services.provider.sessions();

    assert!(sessions.add_lock(BLOG_INDEX));

    let started = Instant::now();
    let err = ctx
        .services
        .provider
        .search()
        .list_result_for(BLOG_INDEX)
        .await
        .unwrap_err();
    let waited = started.elapsed();

    assert!(err.is_timeout());
    assert!(waited >= Duration::from_millis(1000));
    assert!(waited < Duration::from_secs(3));

    sessions.release_lock(BLOG_INDEX);
}

#[tokio::test]
async fn test_default_gate_timeout_is_five_seconds() {
    let ctx = create_test_services();
    assert_eq!(
        ctx.services.provider.sessions().gate_timeout(),
        Duration::from_secs(5)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_waiter_resumes_when_gate_lifts() {
    let ctx = seeded_blog().await;
    let provider = Arc::clone(&ctx.services.provider);
    let sessions = Arc::clone(provider.sessions());

    let gate = sessions.exclusive(&[BLOG_INDEX]);
    let waiter = {
        let provider = Arc::clone(&provider);
        tokio::spawn(async move { provider.get_by_id::<BlogPost>("1").await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!waiter.is_finished());

    drop(gate);
    let found = waiter.await.unwrap().unwrap();
    assert!(found.is_found());
    assert!(!sessions.is_locked(BLOG_INDEX));
}

#[tokio::test]
async fn test_unit_of_work_commits_on_drop() {
    let ctx = seeded_blog().await;
    let provider = &ctx.services.provider;

    {
        let _scope = provider.begin_unit_of_work(ScopeEnd::Commit);
        provider.store_entities(&[post("41", 3)]).await.unwrap();
    }

    assert!(provider.sessions().has_session(BLOG_INDEX));
    assert!(provider.get_by_id::<BlogPost>("41").await.unwrap().is_found());
}

#[tokio::test]
async fn test_unit_of_work_close_releases_sessions() {
    let ctx = seeded_blog().await;
    let provider = &ctx.services.provider;

    let scope = provider.begin_unit_of_work(ScopeEnd::Close);
    provider.store_entities(&[post("42", 3)]).await.unwrap();
    scope.complete().await;

    assert!(!provider.sessions().has_session(BLOG_INDEX));
    assert!(provider.get_by_id::<BlogPost>("42").await.unwrap().is_found());
}

#[tokio::test]
async fn test_shutdown_closes_everything() {
    let ctx = seeded_blog().await;
    let provider = &ctx.services.provider;

    provider.store_entities(&[post("43", 3)]).await.unwrap();
    assert_eq!(provider.shutdown().await, 1);
    assert!(!provider.sessions().has_session(BLOG_INDEX));

    // Pending writes were flushed on close
    assert!(provider.get_by_id::<BlogPost>("43").await.unwrap().is_found());
}
