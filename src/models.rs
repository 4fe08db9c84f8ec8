use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::platforms::Platform;

/// One piece of platform content in the shape shared by every platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Only unique within one platform's results for one keyword.
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    pub content: String,
    pub author: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub engagement: Option<Engagement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub views: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ratio: Option<f64>,
}

/// Outcome of crawling one platform for one keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostResult {
    pub platform: Platform,
    pub keyword: String,
    pub posts: Vec<Post>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl PostResult {
    pub fn success(platform: Platform, keyword: impl Into<String>, posts: Vec<Post>) -> Self {
        Self {
            platform,
            keyword: keyword.into(),
            posts,
            error: None,
        }
    }

    pub fn failure(platform: Platform, keyword: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            platform,
            keyword: keyword.into(),
            posts: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlResponse {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub results: Vec<PostResult>,
    pub summary: CrawlSummary,
}

impl CrawlResponse {
    pub fn new(requested_keywords: usize, results: Vec<PostResult>) -> Self {
        let summary = CrawlSummary::from_results(requested_keywords, &results);
        Self {
            success: true,
            timestamp: Utc::now(),
            results,
            summary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlSummary {
    /// Keywords as requested, before deduplication.
    pub total_keywords: usize,
    pub total_posts: usize,
    pub platforms_queried: Vec<Platform>,
}

impl CrawlSummary {
    pub fn from_results(requested_keywords: usize, results: &[PostResult]) -> Self {
        let total_posts = results.iter().map(|r| r.posts.len()).sum();

        let mut platforms_queried = Vec::new();
        for result in results {
            if !platforms_queried.contains(&result.platform) {
                platforms_queried.push(result.platform);
            }
        }

        Self {
            total_keywords: requested_keywords,
            total_posts,
            platforms_queried,
        }
    }
}
