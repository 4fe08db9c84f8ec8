use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::warn;

use super::probe::{self, array, count, float, text};
use super::{Platform, PlatformClient, SearchContext, synthetic_id};
use crate::error::Result;
use crate::http::ApiRequest;
use crate::models::{Engagement, Post};

const SEARCH_PATH: &str = "/getSearchPosts";
const REDDIT_BASE: &str = "https://www.reddit.com";

pub struct RedditClient {
    ctx: SearchContext,
    host: String,
}

impl RedditClient {
    pub fn new(ctx: SearchContext, host: impl Into<String>) -> Self {
        Self {
            ctx,
            host: host.into(),
        }
    }

    fn request(&self, keyword: &str) -> ApiRequest {
        ApiRequest::new(self.host.clone(), SEARCH_PATH).param("query", keyword)
    }
}

#[async_trait]
impl PlatformClient for RedditClient {
    fn platform(&self) -> Platform {
        Platform::Reddit
    }

    async fn search_posts(&self, keyword: &str) -> Result<Vec<Post>> {
        let limit = self.ctx.max_posts;
        self.ctx
            .fetch_posts(Platform::Reddit, keyword, self.request(keyword), |raw| {
                parse_search(raw, limit)
            })
            .await
    }
}

/// Maps a search response onto at most `limit` posts.
pub fn parse_search(raw: &Value, limit: usize) -> Vec<Post> {
    let Some(items) = array(raw, &["data/posts", "posts", "data/children", "data"]) else {
        warn!("Reddit response has no post list");
        return Vec::new();
    };

    items
        .iter()
        .filter(|item| item.is_object())
        .take(limit)
        .enumerate()
        .map(|(index, item)| parse_post(unwrap_thing(item), index))
        .collect()
}

/// Listing items come as `{kind, data}`; some proxies flatten them.
fn unwrap_thing(item: &Value) -> &Value {
    match item.get("data") {
        Some(inner) if inner.is_object() && item.get("kind").is_some() => inner,
        _ => item,
    }
}

fn parse_post(post: &Value, index: usize) -> Post {
    let id = text(post, &["id", "post_id", "name"])
        .unwrap_or_else(|| synthetic_id(Platform::Reddit, index));
    let title = text(post, &["title"]);
    let content = text(post, &["selftext", "text", "body", "title"]).unwrap_or_default();
    let author = text(post, &["author", "author_name"]).unwrap_or_else(|| "Reddit User".to_string());

    let created_at = float(post, &["created_utc", "created"])
        .and_then(probe::from_unix_seconds)
        .or_else(|| text(post, &["created_at"]).and_then(|s| probe::parse_datetime(&s)))
        .unwrap_or_else(Utc::now);

    Post {
        url: post_url(post, &id),
        id,
        title,
        content,
        author,
        created_at,
        engagement: Some(Engagement {
            likes: count(post, &["ups", "upvotes", "score"]).unwrap_or(0),
            comments: count(post, &["num_comments", "comment_count"]).unwrap_or(0),
            shares: 0,
            views: count(post, &["view_count"]).unwrap_or(0),
            ratio: float(post, &["upvote_ratio"]),
        }),
    }
}

fn post_url(post: &Value, id: &str) -> String {
    if let Some(url) = text(post, &["url", "url_overridden_by_dest"]) {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url;
        }
    }

    match text(post, &["permalink"]) {
        Some(link) if link.starts_with("http") => link,
        Some(link) => format!("{}/{}", REDDIT_BASE, link.trim_start_matches('/')),
        None => format!("{}/comments/{}", REDDIT_BASE, id.trim_start_matches("t3_")),
    }
}
