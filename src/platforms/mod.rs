//! Platform search clients.
//!
//! Every platform sits behind [`PlatformClient`]. A client builds one request
//! per keyword, routes it through the shared [`PostCache`], and hands the raw
//! body to its own parser. Parsers are plain functions from JSON to posts:
//! they never fail, they only find less.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::cache::{ResponseCache, cache_key};
use crate::error::Result;
use crate::http::{ApiRequest, Transport};
use crate::models::Post;

pub mod linkedin;
pub mod probe;
pub mod reddit;
pub mod twitter;

pub use linkedin::LinkedInClient;
pub use reddit::RedditClient;
pub use twitter::TwitterClient;

pub type PostCache = ResponseCache<Vec<Post>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Reddit,
    Twitter,
    LinkedIn,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Reddit, Platform::Twitter, Platform::LinkedIn];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Reddit => "reddit",
            Platform::Twitter => "twitter",
            Platform::LinkedIn => "linkedin",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reddit" => Ok(Platform::Reddit),
            "twitter" | "x" => Ok(Platform::Twitter),
            "linkedin" => Ok(Platform::LinkedIn),
            other => Err(format!("unknown platform '{}'", other)),
        }
    }
}

#[async_trait]
pub trait PlatformClient: Send + Sync {
    fn platform(&self) -> Platform;

    /// Searches for `keyword`, which the caller has already trimmed and
    /// lowercased. Transport failures come back as `Err`; an unexpected
    /// response shape comes back as fewer (possibly zero) posts.
    async fn search_posts(&self, keyword: &str) -> Result<Vec<Post>>;
}

/// What every client needs besides its own host and parser.
#[derive(Clone)]
pub struct SearchContext {
    pub transport: Arc<dyn Transport>,
    pub cache: Arc<PostCache>,
    pub max_posts: usize,
}

impl SearchContext {
    pub fn new(transport: Arc<dyn Transport>, cache: Arc<PostCache>, max_posts: usize) -> Self {
        Self {
            transport,
            cache,
            max_posts,
        }
    }

    /// Cache-wrapped fetch shared by all platforms.
    pub async fn fetch_posts<P>(
        &self,
        platform: Platform,
        keyword: &str,
        request: ApiRequest,
        parse: P,
    ) -> Result<Vec<Post>>
    where
        P: FnOnce(&Value) -> Vec<Post> + Send,
    {
        let key = cache_key(platform, keyword, self.max_posts);
        self.cache
            .get_or_fetch(&key, || async {
                let raw = self.transport.get_json(&request).await?;
                let posts = parse(&raw);
                info!(
                    platform = %platform,
                    keyword,
                    count = posts.len(),
                    "Fetched posts"
                );
                Ok(posts)
            })
            .await
    }
}

/// Stand-in id for items that arrive without one.
pub(crate) fn synthetic_id(platform: Platform, index: usize) -> String {
    format!("{}-{}-{}", platform, Utc::now().timestamp_millis(), index)
}
