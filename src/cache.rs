use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::CrawlConfig;
use crate::error::Result;
use crate::platforms::Platform;

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    fn age(&self, now: DateTime<Utc>) -> Duration {
        // A clock step backwards reads as a fresh entry.
        (now - self.timestamp).to_std().unwrap_or_default()
    }
}

/// In-memory, process-lifetime cache of successful fetch results.
pub struct ResponseCache<T> {
    enabled: bool,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

pub fn cache_key(platform: Platform, keyword: &str, limit: usize) -> String {
    format!("{}:{}:{}", platform, keyword, limit)
}

impl<T: Clone> ResponseCache<T> {
    pub fn new(enabled: bool, ttl: Duration) -> Self {
        Self {
            enabled,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(config.enable_caching, config.cache_ttl)
    }

    /// Returns the cached value for `key` while it is younger than the TTL,
    /// otherwise runs `fetch` and stores its result. Errors from `fetch` are
    /// returned as-is and never stored.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !self.enabled {
            return fetch().await;
        }

        // Keep the lock out of the await below.
        {
            let entries = self.lock();
            if let Some(cached) = entries.get(key) {
                if cached.age(Utc::now()) < self.ttl {
                    info!(key, "Cache hit");
                    return Ok(cached.data.clone());
                }
            }
        }

        info!(key, "Cache miss, fetching from API");
        let data = fetch().await?;

        self.lock().insert(
            key.to_string(),
            CacheEntry {
                data: data.clone(),
                timestamp: Utc::now(),
            },
        );

        Ok(data)
    }

    /// Drops every entry whose age has reached the TTL.
    pub fn clear_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.age(now) < self.ttl);
        let removed = before - entries.len();

        if removed > 0 {
            info!(removed, "Cleared expired cache entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: Clone + Send + 'static> ResponseCache<T> {
    /// Runs `clear_expired` every `every` until the handle is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = cache.clear_expired();
                debug!(removed, remaining = cache.len(), "Cache sweep");
            }
        })
    }
}
