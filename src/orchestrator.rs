use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{error, info};

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::error::Result;
use crate::http::{RapidApiTransport, Transport, shared_client};
use crate::models::{CrawlResponse, PostResult};
use crate::platforms::{
    LinkedInClient, Platform, PlatformClient, PostCache, RedditClient, SearchContext,
    TwitterClient,
};

/// Runs every platform client for each keyword and collects one
/// [`PostResult`] per (keyword, platform) pair.
pub struct CrawlerOrchestrator {
    clients: Vec<Arc<dyn PlatformClient>>,
    batch_delay: Duration,
}

impl CrawlerOrchestrator {
    pub fn new(clients: Vec<Arc<dyn PlatformClient>>, batch_delay: Duration) -> Self {
        Self {
            clients,
            batch_delay,
        }
    }

    /// Wires the RapidAPI transport, one shared cache and the enabled
    /// platform clients. Returns the cache so the caller can sweep it.
    pub fn from_config(config: &Config) -> Result<(Self, Arc<PostCache>)> {
        let client = shared_client(config.crawl.request_timeout)?;
        let transport: Arc<dyn Transport> =
            Arc::new(RapidApiTransport::new(client, config.rapid_api.key.clone()));
        let cache = Arc::new(ResponseCache::from_config(&config.crawl));
        let orchestrator = Self::with_transport(config, transport, Arc::clone(&cache));
        Ok((orchestrator, cache))
    }

    pub fn with_transport(
        config: &Config,
        transport: Arc<dyn Transport>,
        cache: Arc<PostCache>,
    ) -> Self {
        let ctx = SearchContext::new(transport, cache, config.crawl.max_posts_per_keyword);
        let hosts = &config.rapid_api.hosts;

        let clients = config
            .platforms
            .iter()
            .map(|platform| -> Arc<dyn PlatformClient> {
                match platform {
                    Platform::Reddit => Arc::new(RedditClient::new(ctx.clone(), &hosts.reddit)),
                    Platform::Twitter => Arc::new(TwitterClient::new(ctx.clone(), &hosts.twitter)),
                    Platform::LinkedIn => {
                        Arc::new(LinkedInClient::new(ctx.clone(), &hosts.linkedin))
                    }
                }
            })
            .collect();

        Self::new(clients, config.crawl.batch_delay)
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.clients.iter().map(|c| c.platform()).collect()
    }

    /// Crawls and wraps the results with a summary.
    pub async fn crawl(&self, keywords: &[String]) -> CrawlResponse {
        let results = self.crawl_platforms(keywords).await;
        let response = CrawlResponse::new(keywords.len(), results);

        info!(
            total_posts = response.summary.total_posts,
            platforms = response.summary.platforms_queried.len(),
            failed = response.results.iter().filter(|r| r.is_error()).count(),
            "Crawl completed"
        );
        response
    }

    /// Keywords are handled one at a time, platforms for a keyword all at
    /// once. A failing platform only ever affects its own result.
    pub async fn crawl_platforms(&self, keywords: &[String]) -> Vec<PostResult> {
        let keywords = unique_keywords(keywords);
        info!(keywords = keywords.len(), "Starting crawl");

        let mut results = Vec::with_capacity(keywords.len() * self.clients.len());
        for (i, keyword) in keywords.iter().enumerate() {
            if i > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
            results.extend(self.crawl_keyword(keyword).await);
        }

        results
    }

    async fn crawl_keyword(&self, keyword: &str) -> Vec<PostResult> {
        let tasks = self.clients.iter().map(|client| {
            let client = Arc::clone(client);
            let keyword = keyword.to_string();
            tokio::spawn(async move { client.search_posts(&keyword).await })
        });

        // join_all waits for every task and keeps platform order
        let outcomes = join_all(tasks).await;

        self.clients
            .iter()
            .zip(outcomes)
            .map(|(client, outcome)| {
                let platform = client.platform();
                let failure = match outcome {
                    Ok(Ok(posts)) => return PostResult::success(platform, keyword, posts),
                    Ok(Err(e)) => e.to_string(),
                    Err(join_error) => format!("{} crawl task failed: {}", platform, join_error),
                };

                error!(
                    platform = %platform,
                    keyword,
                    error = %failure,
                    "Platform crawl failed"
                );
                PostResult::failure(platform, keyword, failure)
            })
            .collect()
    }
}

/// Trims and lowercases keywords, dropping blanks and repeats while keeping
/// first-occurrence order.
pub fn unique_keywords(keywords: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        let normalized = keyword.trim().to_lowercase();
        if !normalized.is_empty() && !unique.contains(&normalized) {
            unique.push(normalized);
        }
    }
    unique
}
