//! Tracing setup for the crawler binary.
//!
//! Logs always go to stderr so that stdout carries nothing but the crawl
//! result. `RUST_LOG` wins over the configured level when it is set.

use std::str::FromStr;

use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Plain single-line output
    Text,
    /// One JSON object per line
    Json,
    /// Multi-line, colored output for development
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!(
                "Invalid log format: '{}'. Valid options: text, json, pretty",
                s
            )),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
            LogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
}

impl LoggingConfig {
    pub fn new(format: LogFormat, level: impl Into<String>) -> Self {
        Self {
            format,
            level: level.into(),
        }
    }

    /// Installs the global subscriber. Calling this twice is a no-op.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        let installed = match self.format {
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .flatten_event(true)
                .with_target(true)
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .try_init(),
            LogFormat::Text => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .try_init(),
        };

        if installed.is_err() {
            tracing::debug!("tracing subscriber already installed");
        }
    }
}

/// Respects `CRAWLER_LOG_FORMAT` and `CRAWLER_LOG_LEVEL`, falling back to
/// text output at `info`.
pub fn init_default() {
    let format = std::env::var("CRAWLER_LOG_FORMAT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(LogFormat::Text);

    let level = std::env::var("CRAWLER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    LoggingConfig::new(format, level).init();
}
