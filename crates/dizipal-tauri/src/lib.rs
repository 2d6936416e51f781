//! DiziPal Tauri Integration
//!
//! Provides a Tauri plugin that exposes the DiziPal scraper to a frontend.
//!
//! # Usage
//!
//! Register the plugin in your Tauri application:
//!
//! ```ignore
//! fn main() {
//!     tauri::Builder::default()
//!         .plugin(dizipal_tauri::init())
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```
//!
//! Then invoke commands from the frontend:
//!
//! ```javascript
//! import { invoke } from '@tauri-apps/api/core';
//!
//! const page = await invoke('plugin:dizipal|get_catalog_page', { sectionId: 'netflix', pageIndex: 1 });
//! const hits = await invoke('plugin:dizipal|search', { query: 'kara para' });
//! const resolved = await invoke('plugin:dizipal|resolve_stream', {
//!   pageUrl: 'https://rapidvid.net/vod/v1a2b3',
//!   referer: 'https://dizipal953.com/'
//! });
//! ```
//!
//! Listing pages behind the anti-bot challenge are only reachable when
//! `FIRECRAWL_API_KEY` is set in the host environment.

use std::sync::Arc;
use std::time::Duration;

use dizipal_core::{DizipalScraper, FirecrawlBypass, ScraperConfig};
use tauri::{
    Manager, Runtime,
    plugin::{Builder, TauriPlugin},
};
use tracing::info;

mod commands;

/// Shared scraper handle for Tauri commands
///
/// The scraper keeps no per-call state (the rate limiter and response cache
/// synchronize internally), so commands share it without a lock.
pub struct ScraperState {
    pub(crate) scraper: Arc<DizipalScraper>,
}

impl ScraperState {
    /// Create a state with default configuration
    ///
    /// Uses Firecrawl as the challenge bypass when `FIRECRAWL_API_KEY` is set.
    ///
    /// # Errors
    /// Returns error string if scraper initialization fails
    pub fn new() -> Result<Self, String> {
        Self::with_config(ScraperConfig::default())
    }

    /// Create a state with a custom configuration
    pub fn with_config(config: ScraperConfig) -> Result<Self, String> {
        let timeout = Duration::from_secs(config.client.timeout_secs);
        let scraper = match FirecrawlBypass::from_env(timeout) {
            Some(bypass) => {
                info!("challenge bypass enabled: firecrawl");
                DizipalScraper::with_bypass(config, Arc::new(bypass))
            }
            None => DizipalScraper::with_config(config),
        }
        .map_err(|e| e.to_string())?;

        Ok(Self::from_scraper(scraper))
    }

    /// Wrap an already configured scraper
    pub fn from_scraper(scraper: DizipalScraper) -> Self {
        Self {
            scraper: Arc::new(scraper),
        }
    }
}

/// Initialize the dizipal plugin
///
/// # Example
/// ```ignore
/// tauri::Builder::default()
///     .plugin(dizipal_tauri::init())
///     .run(tauri::generate_context!())
///     .expect("error while running tauri application");
/// ```
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new("dizipal")
        .invoke_handler(tauri::generate_handler![
            commands::get_catalog_page,
            commands::search,
            commands::resolve_stream
        ])
        .setup(|app, _api| {
            let state = ScraperState::new().map_err(Box::<dyn std::error::Error>::from)?;
            app.manage(state);
            Ok(())
        })
        .build()
}

// Re-export types for convenience
pub use dizipal_core::{CatalogEntry, CatalogPage, ResolvedStream};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scraper_state_creation() {
        let state = ScraperState::new();
        assert!(state.is_ok());
    }

    #[test]
    fn test_scraper_state_shares_one_scraper() {
        let state = ScraperState::from_scraper(DizipalScraper::new().unwrap());
        let other = Arc::clone(&state.scraper);
        assert_eq!(Arc::strong_count(&other), 2);
        assert_eq!(other.sections().len(), 11);
    }
}
