// Test helper functions

use super::fixtures::{blog_posts, BLOG_INDEX, BLOG_TEMP_INDEX};
use shelf::core::config::Config;
use shelf::core::services::Services;
use shelf::core::storage::{FieldKind, FieldSpec, IndexConfiguration, IndexSchema};
use std::time::Duration;
use tempfile::TempDir;

/// Services plus the scratch directory backing them
#[allow(dead_code)]
pub struct TestContext {
    pub services: Services,
    pub dir: TempDir,
}

/// Configuration shared by the live and rebuilt blog indexes
#[allow(dead_code)]
pub fn blog_configuration() -> IndexConfiguration {
    IndexConfiguration::new(
        [BLOG_INDEX, BLOG_TEMP_INDEX],
        IndexSchema::new(vec![
            FieldSpec::new("Name", FieldKind::Text),
            FieldSpec::new("Body", FieldKind::Text),
            FieldSpec::new("PublishedDate", FieldKind::Date),
            FieldSpec::new("Views", FieldKind::I64),
            FieldSpec::new("TagIds", FieldKind::Keyword),
            FieldSpec::new("Tags.Id", FieldKind::Keyword),
            FieldSpec::new("Tags.Name", FieldKind::Keyword),
        ]),
    )
}

/// Create test services over a temporary index root
#[allow(dead_code)]
pub fn create_test_services() -> TestContext {
    create_test_services_with_timeout(Duration::from_secs(5))
}

#[allow(dead_code)]
pub fn create_test_services_with_timeout(gate_timeout: Duration) -> TestContext {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let mut config = Config::default();
    config.storage.index_dir = dir.path().join("indexes");
    config.sessions.gate_timeout_ms = gate_timeout.as_millis() as u64;
    config.sessions.writer_heap_bytes = 15_000_000;
    config.indexes.push(blog_configuration());

    let services = Services::new(config).expect("Failed to create services");
    TestContext { services, dir }
}

/// Services with the blog index created, filled and committed
#[allow(dead_code)]
pub async fn seeded_blog() -> TestContext {
    let ctx = create_test_services();
    let provider = &ctx.services.provider;

    provider
        .create_index_if_not_exists(BLOG_INDEX)
        .await
        .expect("Failed to create blog index");
    let stored = provider
        .store_entities(&blog_posts())
        .await
        .expect("Failed to store posts");
    assert_eq!(stored, 10);
    provider.commit(BLOG_INDEX).await.expect("Failed to commit");

    ctx
}
