//! Walk the pipeline against the live site: one catalog page, a search and
//! optionally a stream resolution.
//!
//! ```text
//! RUST_LOG=dizipal_core=debug cargo run --example resolve_demo -- "kara para" https://rapidvid.net/vod/v1a2b3
//! ```
//!
//! Set `FIRECRAWL_API_KEY` to get past challenge pages on listings.

use std::sync::Arc;
use std::time::Duration;

use dizipal_core::{DizipalScraper, FirecrawlBypass, ScraperConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let query = args.next().unwrap_or_else(|| "kara para".to_string());
    let page_url = args.next();

    let config = ScraperConfig::default();
    let timeout = Duration::from_secs(config.client.timeout_secs);
    let scraper = match FirecrawlBypass::from_env(timeout) {
        Some(bypass) => DizipalScraper::with_bypass(config, Arc::new(bypass))?,
        None => DizipalScraper::with_config(config)?,
    };

    match scraper.get_catalog_page("diziler", 1).await {
        Ok(page) => {
            println!("=== {} ({} entries) ===", page.section, page.entries.len());
            for entry in page.entries.iter().take(10) {
                println!("  {:?} {} -> {}", entry.media_kind, entry.title, entry.detail_url);
            }
        }
        Err(e) => println!("catalog failed: {}", e),
    }

    println!("\n=== search: {} ===", query);
    for entry in scraper.search(&query).await? {
        println!("  {:?} {} -> {}", entry.media_kind, entry.title, entry.detail_url);
    }

    if let Some(page_url) = page_url {
        let resolved = scraper.resolve_stream(&page_url, None).await?;
        println!("\n=== stream ===");
        println!("  {} {:?} {}", resolved.stream.source_name, resolved.stream.media_format, resolved.stream.source_url);
        for (name, value) in &resolved.stream.required_headers {
            println!("  header {}: {}", name, value);
        }
        for track in &resolved.subtitles {
            println!("  subtitle {}: {}", track.language_label, track.url);
        }
    }

    Ok(())
}
