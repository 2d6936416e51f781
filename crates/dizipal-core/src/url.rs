//! URL helper functions for DiziPal
//!
//! Provides functions for building listing and search URLs and for
//! turning scraped relative links into absolute ones.

use url::Url;

/// Default site origin
pub const BASE_URL: &str = "https://dizipal953.com";

/// Path of the autocomplete search endpoint
pub const SEARCH_PATH: &str = "/api/search-autocomplete";

/// Resolves a scraped link against the page it came from
///
/// Handles absolute links, protocol-relative links (`//cdn/...`) and
/// root-relative links (`/dizi/...`). Returns `None` for blank input or
/// anything that does not resolve to an http(s) URL.
///
/// # Example
/// ```
/// use dizipal_core::url::absolutize;
/// let url = absolutize("https://dizipal953.com/diziler", "/dizi/dark");
/// assert_eq!(url, Some("https://dizipal953.com/dizi/dark".to_string()));
/// ```
pub fn absolutize(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let base = Url::parse(base).ok()?;
    let resolved = base.join(href).ok()?;

    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

/// Builds the absolute URL of a listing page from a site path
///
/// # Example
/// ```
/// use dizipal_core::url::build_listing_url;
/// let url = build_listing_url("https://dizipal953.com", "/koleksiyon/netflix");
/// assert_eq!(url, "https://dizipal953.com/koleksiyon/netflix");
/// ```
pub fn build_listing_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Builds the autocomplete endpoint URL
///
/// # Example
/// ```
/// use dizipal_core::url::build_search_url;
/// let url = build_search_url("https://dizipal953.com/");
/// assert_eq!(url, "https://dizipal953.com/api/search-autocomplete");
/// ```
pub fn build_search_url(base_url: &str) -> String {
    build_listing_url(base_url, SEARCH_PATH)
}

/// Returns the `scheme://host[:port]/` referer for a URL
///
/// # Example
/// ```
/// use dizipal_core::url::origin_referer;
/// let referer = origin_referer("https://rapidvid.net/vod/abc?x=1");
/// assert_eq!(referer, Some("https://rapidvid.net/".to_string()));
/// ```
pub fn origin_referer(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if !parsed.has_host() {
        return None;
    }
    Some(format!("{}/", parsed.origin().ascii_serialization()))
}

/// Extracts the path component of a URL, or `None` if it does not parse
pub fn path_of(url: &str) -> Option<String> {
    Url::parse(url).ok().map(|u| u.path().to_string())
}
