use social_crawler::{CrawlerOrchestrator, config::Config, logging};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_default();

    // Load configuration
    let config = Config::load()?;

    let keywords: Vec<String> = std::env::args().skip(1).collect();
    if keywords.is_empty() {
        eprintln!("usage: social-crawler <keyword>...");
        std::process::exit(2);
    }

    // One crawl per process, so expired entries never need sweeping here
    let (orchestrator, _cache) = CrawlerOrchestrator::from_config(&config)?;

    info!(
        keywords = keywords.len(),
        platforms = ?orchestrator.platforms(),
        "Received crawl request"
    );

    let response = orchestrator.crawl(&keywords).await;

    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
