// Common test utilities and fixtures

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items
// Note: not every test binary uses every helper
#[allow(unused_imports)]
pub use fixtures::{blog_posts, BlogPost, Tag, BLOG_INDEX, BLOG_TEMP_INDEX};
#[allow(unused_imports)]
pub use helpers::{blog_configuration, create_test_services, seeded_blog, TestContext};
