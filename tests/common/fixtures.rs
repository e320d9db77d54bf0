// Blog fixture shared by the provider and CLI tests

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use shelf::Entity;

#[allow(dead_code)]
pub const BLOG_INDEX: &str = "BlogPost";

#[allow(dead_code)]
pub const BLOG_TEMP_INDEX: &str = "BlogPost_temp";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Body", default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(rename = "PublishedDate")]
    pub published_date: DateTime<Utc>,
    #[serde(rename = "Views", default)]
    pub views: i64,
    #[serde(rename = "TagIds", default)]
    pub tag_ids: Vec<String>,
    #[serde(rename = "Tags", default)]
    pub tags: Vec<Tag>,
}

impl Entity for BlogPost {
    const INDEX: &'static str = BLOG_INDEX;
}

/// Fixed reference point so date ranges are reproducible
#[allow(dead_code)]
pub fn reference_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 8, 22, 6, 0, 0).unwrap()
}

/// Days before the reference date, by post id "1".."10"
const AGES_IN_DAYS: [i64; 10] = [1, 100, 120, 11, 19, 13, 7, 8, 9, 10];

#[allow(dead_code)]
pub fn post(id: &str, age_days: i64) -> BlogPost {
    BlogPost {
        id: id.to_string(),
        name: "My Test Blog Post".to_string(),
        body: None,
        published_date: reference_date() - Duration::days(age_days),
        views: age_days * 10,
        tag_ids: Vec::new(),
        tags: Vec::new(),
    }
}

/// Ten posts with ids "1".."10".
///
/// - post 9 has body "My test body" and tag `my-test-tag`
/// - post 10 carries tag ids "11" and "2"
/// - newest to oldest: 1, 7, 8, 9, 10, 4, 6, 5, 2, 3
#[allow(dead_code)]
pub fn blog_posts() -> Vec<BlogPost> {
    AGES_IN_DAYS
        .iter()
        .enumerate()
        .map(|(i, age)| {
            let id = (i + 1).to_string();
            let mut post = post(&id, *age);
            match id.as_str() {
                "9" => {
                    post.body = Some("My test body".to_string());
                    post.tags = vec![Tag {
                        id: "1".to_string(),
                        name: "my-test-tag".to_string(),
                    }];
                }
                "10" => post.tag_ids = vec!["11".to_string(), "2".to_string()],
                _ => {}
            }
            post
        })
        .collect()
}
