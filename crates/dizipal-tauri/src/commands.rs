//! Tauri commands for the DiziPal scraper

use dizipal_core::{CatalogEntry, CatalogPage, DizipalScraper, ResolvedStream};
use tauri::State;
use tracing::warn;

use crate::ScraperState;

/// Get one page of a catalog section
///
/// # Arguments
/// * `section_id` - Section id such as "diziler" or "netflix"
/// * `page_index` - 1-based page number
///
/// # Errors
/// Returns error message as String if the section is unknown or the fetch fails
#[tauri::command]
pub async fn get_catalog_page(
    state: State<'_, ScraperState>,
    section_id: String,
    page_index: u32,
) -> Result<CatalogPage, String> {
    state
        .scraper
        .get_catalog_page(&section_id, page_index)
        .await
        .map_err(|e| e.to_string())
}

/// Search titles by free text
///
/// An unparseable search response is shown as an empty result list.
#[tauri::command]
pub async fn search(
    state: State<'_, ScraperState>,
    query: String,
) -> Result<Vec<CatalogEntry>, String> {
    search_or_empty(&state.scraper, &query).await
}

/// Resolve a video page into subtitles and a playable stream
///
/// # Arguments
/// * `page_url` - Player page URL
/// * `referer` - Optional referer; the page origin is used when absent
#[tauri::command]
pub async fn resolve_stream(
    state: State<'_, ScraperState>,
    page_url: String,
    referer: Option<String>,
) -> Result<ResolvedStream, String> {
    state
        .scraper
        .resolve_stream(&page_url, referer.as_deref())
        .await
        .map_err(|e| e.to_string())
}

pub(crate) async fn search_or_empty(
    scraper: &DizipalScraper,
    query: &str,
) -> Result<Vec<CatalogEntry>, String> {
    match scraper.search(query).await {
        Ok(entries) => Ok(entries),
        Err(e) if e.is_no_results() => {
            warn!(query, error = %e, "search response unusable, showing no results");
            Ok(Vec::new())
        }
        Err(e) => Err(e.to_string()),
    }
}
