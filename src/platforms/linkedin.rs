use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::warn;

use super::probe::{self, array, at, count, text};
use super::{Platform, PlatformClient, SearchContext, synthetic_id};
use crate::error::Result;
use crate::http::ApiRequest;
use crate::models::{Engagement, Post};

const SEARCH_PATH: &str = "/search-posts";

pub struct LinkedInClient {
    ctx: SearchContext,
    host: String,
}

impl LinkedInClient {
    pub fn new(ctx: SearchContext, host: impl Into<String>) -> Self {
        Self {
            ctx,
            host: host.into(),
        }
    }

    fn request(&self, keyword: &str) -> ApiRequest {
        ApiRequest::new(self.host.clone(), SEARCH_PATH)
            .param("limit", self.ctx.max_posts.to_string())
            .param("offsite", "1")
            .param("query", keyword)
    }
}

#[async_trait]
impl PlatformClient for LinkedInClient {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    async fn search_posts(&self, keyword: &str) -> Result<Vec<Post>> {
        let limit = self.ctx.max_posts;
        self.ctx
            .fetch_posts(Platform::LinkedIn, keyword, self.request(keyword), |raw| {
                parse_search(raw, limit)
            })
            .await
    }
}

pub fn parse_search(raw: &Value, limit: usize) -> Vec<Post> {
    let Some(items) = array(raw, &["data/items", "items", "data"]) else {
        warn!("LinkedIn response has no item list");
        return Vec::new();
    };

    items
        .iter()
        .filter(|item| item.is_object())
        .take(limit)
        .enumerate()
        .map(|(index, item)| parse_post(item, index))
        .collect()
}

fn parse_post(item: &Value, index: usize) -> Post {
    let urn = text(item, &["urn", "id", "shareUrn"]);

    let author = text(
        item,
        &["author/fullName", "author/name", "author/username"],
    )
    .unwrap_or_else(|| "LinkedIn User".to_string());

    let url = text(item, &["url", "postUrl", "shareUrl"])
        .or_else(|| {
            urn.as_ref()
                .map(|urn| format!("https://www.linkedin.com/feed/update/{}", urn))
        })
        .unwrap_or_else(|| "https://www.linkedin.com/feed/".to_string());

    let created_at = at(item, "postedDateTimestamp")
        .and_then(probe::as_count)
        .and_then(|ms| i64::try_from(ms).ok())
        .and_then(probe::from_unix_millis)
        .or_else(|| text(item, &["postedDate"]).and_then(|s| probe::parse_datetime(&s)))
        .unwrap_or_else(Utc::now);

    let counts = ["socialActivityCountsInsight", "socialActivityCounts"]
        .iter()
        .find_map(|key| item.get(*key).filter(|v| v.is_object()))
        .unwrap_or(item);

    Post {
        id: urn.unwrap_or_else(|| synthetic_id(Platform::LinkedIn, index)),
        title: None,
        content: text(item, &["text", "commentary"]).unwrap_or_default(),
        author,
        url,
        created_at,
        engagement: Some(Engagement {
            likes: count(counts, &["likeCount", "totalReactionCount"]).unwrap_or(0),
            comments: count(counts, &["numComments", "commentCount"]).unwrap_or(0),
            // Reposts are not exposed by the search API.
            shares: 0,
            views: 0,
            ratio: None,
        }),
    }
}
