pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod platforms;

pub use config::Config;
pub use error::{AppError, Result};
pub use models::{CrawlResponse, CrawlSummary, Engagement, Post, PostResult};
pub use orchestrator::CrawlerOrchestrator;
pub use platforms::{Platform, PlatformClient};
