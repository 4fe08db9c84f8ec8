use std::env;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::platforms::Platform;

#[derive(Debug, Clone)]
pub struct Config {
    pub rapid_api: RapidApiConfig,
    pub crawl: CrawlConfig,
    /// Platforms queried for every keyword, in result order.
    pub platforms: Vec<Platform>,
}

#[derive(Debug, Clone)]
pub struct RapidApiConfig {
    pub key: String,
    pub hosts: PlatformHosts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformHosts {
    pub reddit: String,
    pub twitter: String,
    pub linkedin: String,
}

impl Default for PlatformHosts {
    fn default() -> Self {
        Self {
            reddit: "reddit34.p.rapidapi.com".to_string(),
            twitter: "twitter241.p.rapidapi.com".to_string(),
            linkedin: "linkedin-data-api.p.rapidapi.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlConfig {
    pub max_posts_per_keyword: usize,
    /// Zero disables the per-request timeout.
    pub request_timeout: Duration,
    pub enable_caching: bool,
    pub cache_ttl: Duration,
    /// Pause between consecutive keywords, never between platforms.
    pub batch_delay: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_posts_per_keyword: 10,
            request_timeout: Duration::from_millis(30_000),
            enable_caching: true,
            cache_ttl: Duration::from_millis(300_000),
            batch_delay: Duration::from_millis(100),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let key = env::var("RAPIDAPI_KEY")?;
        let mut config = Self::from_lookup(|name| env::var(name).ok())?;
        config.rapid_api.key = key;
        Ok(config)
    }

    /// Builds a config from an arbitrary variable source. `RAPIDAPI_KEY` is
    /// optional here; `load` is the entry point that insists on it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = CrawlConfig::default();
        let default_hosts = PlatformHosts::default();

        let hosts = PlatformHosts {
            reddit: lookup("REDDIT_API_HOST").unwrap_or(default_hosts.reddit),
            twitter: lookup("TWITTER_API_HOST").unwrap_or(default_hosts.twitter),
            linkedin: lookup("LINKEDIN_API_HOST").unwrap_or(default_hosts.linkedin),
        };

        let max_posts_per_keyword = match lookup("MAX_POSTS_PER_KEYWORD") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
                AppError::ConfigError(format!("Invalid MAX_POSTS_PER_KEYWORD: {}", e))
            })?,
            None => defaults.max_posts_per_keyword,
        };

        let crawl = CrawlConfig {
            max_posts_per_keyword,
            request_timeout: millis(&lookup, "REQUEST_TIMEOUT", defaults.request_timeout)?,
            enable_caching: lookup("ENABLE_CACHING").map_or(true, |v| v.trim() != "false"),
            cache_ttl: millis(&lookup, "CACHE_TTL", defaults.cache_ttl)?,
            batch_delay: millis(&lookup, "BATCH_DELAY", defaults.batch_delay)?,
        };

        let platforms = match lookup("ENABLED_PLATFORMS") {
            Some(raw) => parse_platforms(&raw)?,
            None => Platform::ALL.to_vec(),
        };

        Ok(Config {
            rapid_api: RapidApiConfig {
                key: lookup("RAPIDAPI_KEY").unwrap_or_default(),
                hosts,
            },
            crawl,
            platforms,
        })
    }
}

fn millis<F>(lookup: &F, name: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", name, e))),
        None => Ok(default),
    }
}

fn parse_platforms(raw: &str) -> Result<Vec<Platform>> {
    let mut platforms = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let platform = name
            .parse::<Platform>()
            .map_err(|e| AppError::ConfigError(format!("Invalid ENABLED_PLATFORMS: {}", e)))?;
        if !platforms.contains(&platform) {
            platforms.push(platform);
        }
    }

    if platforms.is_empty() {
        return Err(AppError::ConfigError(
            "ENABLED_PLATFORMS must name at least one platform".to_string(),
        ));
    }

    // Results are always reported in the canonical platform order.
    platforms.sort_by_key(|p| Platform::ALL.iter().position(|q| q == p));
    Ok(platforms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.crawl, CrawlConfig::default());
        assert_eq!(config.rapid_api.hosts, PlatformHosts::default());
        assert_eq!(config.platforms, Platform::ALL.to_vec());
        assert!(config.rapid_api.key.is_empty());
    }

    #[test]
    fn overrides_are_read_in_milliseconds() {
        let config = Config::from_lookup(lookup_from(&[
            ("RAPIDAPI_KEY", "secret"),
            ("MAX_POSTS_PER_KEYWORD", "5"),
            ("REQUEST_TIMEOUT", "1500"),
            ("CACHE_TTL", "60000"),
            ("BATCH_DELAY", "0"),
            ("TWITTER_API_HOST", "twitter-proxy.example.com"),
        ]))
        .unwrap();

        assert_eq!(config.rapid_api.key, "secret");
        assert_eq!(config.crawl.max_posts_per_keyword, 5);
        assert_eq!(config.crawl.request_timeout, Duration::from_millis(1500));
        assert_eq!(config.crawl.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.crawl.batch_delay, Duration::ZERO);
        assert_eq!(config.rapid_api.hosts.twitter, "twitter-proxy.example.com");
    }

    #[test]
    fn zero_request_timeout_is_kept_as_unbounded() {
        let config = Config::from_lookup(lookup_from(&[("REQUEST_TIMEOUT", "0")])).unwrap();
        assert!(config.crawl.request_timeout.is_zero());
        assert!(crate::http::build_client(config.crawl.request_timeout).is_ok());
    }

    #[test]
    fn caching_is_only_disabled_by_literal_false() {
        let off = Config::from_lookup(lookup_from(&[("ENABLE_CACHING", "false")])).unwrap();
        assert!(!off.crawl.enable_caching);

        let on = Config::from_lookup(lookup_from(&[("ENABLE_CACHING", "0")])).unwrap();
        assert!(on.crawl.enable_caching);
    }

    #[test]
    fn invalid_numbers_are_config_errors() {
        let err = Config::from_lookup(lookup_from(&[("CACHE_TTL", "five minutes")])).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(msg) if msg.contains("CACHE_TTL")));
    }

    #[test]
    fn enabled_platforms_are_deduplicated_and_ordered() {
        let config = Config::from_lookup(lookup_from(&[(
            "ENABLED_PLATFORMS",
            "linkedin, x ,reddit,linkedin",
        )]))
        .unwrap();
        assert_eq!(
            config.platforms,
            vec![Platform::Reddit, Platform::Twitter, Platform::LinkedIn]
        );

        let err = Config::from_lookup(lookup_from(&[("ENABLED_PLATFORMS", "myspace")]));
        assert!(err.is_err());
        let err = Config::from_lookup(lookup_from(&[("ENABLED_PLATFORMS", " , ")]));
        assert!(err.is_err());
    }
}
