//! DiziPal Scraper Core Library
//!
//! Provides an async API for browsing DiziPal catalogs, searching titles and
//! resolving RapidVid video pages into playable stream URLs.
//!
//! # Overview
//!
//! This crate provides the extraction pipeline:
//! - Challenge-aware HTTP client that detects anti-bot interstitials on
//!   listing pages and re-issues the request through a bypass strategy
//! - Byte-bounded LRU response cache that never stores challenge pages
//! - HTML/JSON parsers for listing tiles and autocomplete results
//! - A deobfuscation chain that recovers hex-encoded media URLs and subtitles
//!
//! # Example
//!
//! ```no_run
//! use dizipal_core::{DizipalScraper, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let scraper = DizipalScraper::new()?;
//!
//!     let page = scraper.get_catalog_page("diziler", 1).await?;
//!     for entry in &page.entries {
//!         println!("{}: {}", entry.title, entry.detail_url);
//!     }
//!
//!     let resolved = scraper
//!         .resolve_stream("https://rapidvid.net/vod/v1a2b3", Some("https://dizipal953.com/"))
//!         .await?;
//!     println!("Stream: {}", resolved.stream.source_url);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Challenge pages
//!
//! Without a configured [`ChallengeBypass`], a challenge page on a listing
//! path surfaces as [`DizipalError::BypassFailed`]. Supply one through
//! [`DizipalScraper::with_bypass`] (for example [`FirecrawlBypass`]).
//!
//! # Stream URLs
//!
//! Resolved media URLs are usually short-lived; the player must send the
//! headers in [`StreamDescriptor::required_headers`].

mod bypass;
mod cache;
mod client;
mod error;
pub mod parser;
mod scraper;
mod types;
pub mod url;

// Re-export client types
pub use client::{ClientConfig, DizipalClient, FetchedPage, Method, PageRequest, RateLimiter};

// Re-export bypass strategies
pub use bypass::{ChallengeBypass, FirecrawlBypass, NoBypass};

// Re-export cache
pub use cache::ResponseCache;

// Re-export error types
pub use error::{DizipalError, Result};

// Re-export main scraper API
pub use scraper::{CatalogSection, DizipalScraper, ScraperConfig, default_sections};

// Re-export data types
pub use types::{
    CatalogEntry, CatalogPage, ChallengeState, MediaFormat, MediaKind, Quality, ResolvedStream,
    StreamDescriptor, SubtitleTrack,
};
