//! Main scraper API for DiziPal
//!
//! Provides the high-level API combining the challenge-aware client and parsers.

use std::sync::Arc;

use tracing::debug;

use crate::bypass::ChallengeBypass;
use crate::client::{ClientConfig, DizipalClient, PageRequest};
use crate::error::{DizipalError, Result};
use crate::parser::listing::parse_listing;
use crate::parser::search::parse_search_response;
use crate::parser::stream::{ExtractionStrategy, default_strategies, parse_stream_page};
use crate::types::{CatalogEntry, CatalogPage, ResolvedStream};
use crate::url::{build_listing_url, build_search_url, origin_referer};

const ACCEPT_JSON: &str = "application/json, text/javascript, */*; q=0.01";

/// A browsable category of the site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSection {
    /// Stable id used by hosts (e.g. "netflix")
    pub id: String,
    /// Display name (e.g. "Netflix")
    pub name: String,
    /// Site path of the listing (e.g. "/koleksiyon/netflix")
    pub path: String,
}

impl CatalogSection {
    pub fn new(id: &str, name: &str, path: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            path: path.to_string(),
        }
    }
}

/// Sections shown on the site's home page
pub fn default_sections() -> Vec<CatalogSection> {
    vec![
        CatalogSection::new("son-bolumler", "Son Bölümler", "/diziler/son-bolumler"),
        CatalogSection::new("diziler", "Yeni Diziler", "/diziler"),
        CatalogSection::new("filmler", "Yeni Filmler", "/filmler"),
        CatalogSection::new("netflix", "Netflix", "/koleksiyon/netflix"),
        CatalogSection::new("exxen", "Exxen", "/koleksiyon/exxen"),
        CatalogSection::new("blutv", "BluTV", "/koleksiyon/blutv"),
        CatalogSection::new("disney", "Disney+", "/koleksiyon/disney"),
        CatalogSection::new("amazon-prime", "Amazon Prime", "/koleksiyon/amazon-prime"),
        CatalogSection::new("tod-bein", "TOD (beIN)", "/koleksiyon/tod-bein"),
        CatalogSection::new("gain", "Gain", "/koleksiyon/gain"),
        CatalogSection::new("mubi", "Mubi", "/tur/mubi"),
    ]
}

/// Full scraper configuration
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub client: ClientConfig,
    pub sections: Vec<CatalogSection>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            sections: default_sections(),
        }
    }
}

/// Main scraper API for DiziPal
///
/// Combines the challenge-aware HTTP client with the listing, search and
/// stream parsers. Holds no per-call mutable state, so one instance can
/// serve concurrent calls.
pub struct DizipalScraper {
    client: DizipalClient,
    sections: Vec<CatalogSection>,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl DizipalScraper {
    /// Create a new scraper with default configuration
    ///
    /// # Errors
    /// Returns error if HTTP client initialization fails
    pub fn new() -> Result<Self> {
        Self::with_config(ScraperConfig::default())
    }

    /// Create a new scraper with custom configuration and no challenge bypass
    pub fn with_config(config: ScraperConfig) -> Result<Self> {
        let client = DizipalClient::with_config(config.client)?;
        Ok(Self::from_client(client, config.sections))
    }

    /// Create a new scraper with custom configuration and a challenge bypass
    pub fn with_bypass(config: ScraperConfig, bypass: Arc<dyn ChallengeBypass>) -> Result<Self> {
        let client = DizipalClient::with_bypass(config.client, bypass)?;
        Ok(Self::from_client(client, config.sections))
    }

    fn from_client(client: DizipalClient, sections: Vec<CatalogSection>) -> Self {
        Self {
            client,
            sections,
            strategies: default_strategies(),
        }
    }

    /// Append an extraction strategy after the built-in ones
    pub fn with_strategy(mut self, strategy: Box<dyn ExtractionStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn sections(&self) -> &[CatalogSection] {
        &self.sections
    }

    pub fn client(&self) -> &DizipalClient {
        &self.client
    }

    fn base_url(&self) -> &str {
        self.client.config().base_url.trim_end_matches('/')
    }

    fn site_referer(&self) -> String {
        format!("{}/", self.base_url())
    }

    /// Get one page of a catalog section
    ///
    /// The site renders each section on a single page, so `has_next` is
    /// always false and pages past the first are empty.
    ///
    /// # Errors
    /// - `UnknownSection` if `section_id` is not configured
    /// - `InvalidQuery` if `page_index` is 0 (pages are 1-based)
    /// - transport errors from [`DizipalScraper::scrape_listing`]
    ///
    /// # Example
    /// ```no_run
    /// # async fn example() -> dizipal_core::Result<()> {
    /// use dizipal_core::DizipalScraper;
    /// let scraper = DizipalScraper::new()?;
    /// let page = scraper.get_catalog_page("netflix", 1).await?;
    /// for entry in page.entries {
    ///     println!("{}: {}", entry.title, entry.detail_url);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_catalog_page(&self, section_id: &str, page_index: u32) -> Result<CatalogPage> {
        let section = self
            .sections
            .iter()
            .find(|s| s.id == section_id)
            .ok_or_else(|| DizipalError::UnknownSection(section_id.to_string()))?;

        if page_index == 0 {
            return Err(DizipalError::InvalidQuery(
                "page index starts at 1".to_string(),
            ));
        }

        let entries = if page_index == 1 {
            let url = build_listing_url(self.base_url(), &section.path);
            self.scrape_listing(&url).await?
        } else {
            Vec::new()
        };

        Ok(CatalogPage {
            section: section.name.clone(),
            entries,
            has_next: false,
        })
    }

    /// Fetch a listing page and extract its tiles
    ///
    /// The result keeps document order of the tiles that produced an entry.
    /// Malformed tiles are dropped, but a failed fetch fails the whole call.
    pub async fn scrape_listing(&self, page_url: &str) -> Result<Vec<CatalogEntry>> {
        let request = PageRequest::get(page_url).with_header("Referer", self.site_referer());
        let html = self.client.fetch_text(&request).await?;

        let entries = parse_listing(&html, page_url);
        debug!(url = page_url, entries = entries.len(), "listing scraped");
        Ok(entries)
    }

    /// Search titles through the autocomplete endpoint
    ///
    /// # Errors
    /// - `InvalidQuery` if query is empty or whitespace only
    /// - `MalformedResponse` if the body is not a keyed object of records
    /// - transport errors
    ///
    /// # Example
    /// ```no_run
    /// # async fn example() -> dizipal_core::Result<()> {
    /// use dizipal_core::DizipalScraper;
    /// let scraper = DizipalScraper::new()?;
    /// let results = scraper.search("kara para aşk").await?;
    /// for entry in results {
    ///     println!("{} ({:?})", entry.title, entry.media_kind);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn search(&self, query: &str) -> Result<Vec<CatalogEntry>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(DizipalError::InvalidQuery(
                "Search query cannot be empty".to_string(),
            ));
        }

        let request = PageRequest::post_form(
            build_search_url(self.base_url()),
            vec![("query".to_string(), trimmed.to_string())],
        )
        .with_header("Accept", ACCEPT_JSON)
        .with_header("X-Requested-With", "XMLHttpRequest")
        .with_header("Referer", self.site_referer());

        let body = self.client.fetch_text(&request).await?;
        parse_search_response(&body, self.base_url())
    }

    /// Resolve a video page into subtitles and a playable stream
    ///
    /// # Arguments
    /// * `page_url` - Player page URL (e.g. a RapidVid embed)
    /// * `referer` - Referer to fetch with; defaults to the page's own origin
    ///
    /// # Errors
    /// - `InvalidUrl` if `page_url` is not an absolute URL
    /// - `StreamNotFound` if no extraction strategy yields a URL
    /// - transport errors
    ///
    /// The page is always fetched live; it never goes through the response cache.
    pub async fn resolve_stream(
        &self,
        page_url: &str,
        referer: Option<&str>,
    ) -> Result<ResolvedStream> {
        let page_origin =
            origin_referer(page_url).ok_or_else(|| DizipalError::InvalidUrl(page_url.to_string()))?;
        let referer = referer
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .unwrap_or(page_origin);

        // Player pages carry short-lived media URLs
        let request = PageRequest::get(page_url)
            .with_header("Referer", referer.as_str())
            .uncached();
        let page = self.client.fetch_text(&request).await?;

        parse_stream_page(&page, page_url, &referer, &self.strategies)
    }

    /// Write the response cache snapshot, if a cache path is configured
    pub async fn persist_cache(&self) -> std::io::Result<()> {
        self.client.persist_cache().await
    }
}
