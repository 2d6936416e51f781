//! Listing page parser for DiziPal
//!
//! A listing page is a grid of tiles (`article.type2 ul li`). Each tile is
//! read on its own; a tile that lacks a title or link is skipped without
//! affecting its siblings.

use scraper::{ElementRef, Html, Selector};

use crate::types::{CatalogEntry, MediaKind};
use crate::url::absolutize;

/// CSS selector matching one tile on a listing page
pub const TILE_SELECTOR: &str = "article.type2 ul li";

/// Parses one tile element into a catalog entry
///
/// # Arguments
/// * `tile` - The tile's `li` element
/// * `page_url` - URL of the listing page, used to resolve relative links
///
/// # Returns
/// `None` when the tile has no title or no usable link
pub fn parse_tile(tile: &ElementRef, page_url: &str) -> Option<CatalogEntry> {
    let title = first_text(tile, "span.title")?;
    let href = first_attr(tile, "a", &["href"])?;
    let detail_url = absolutize(page_url, &href)?;
    let poster_url = first_attr(tile, "img", &["src", "data-src"])
        .and_then(|src| absolutize(page_url, &src));

    let media_kind = MediaKind::from_detail_url(&detail_url);
    CatalogEntry::new(&title, &detail_url, poster_url, media_kind)
}

/// Parses a whole listing page
///
/// Tiles missing a title or link are skipped; the rest keep document order.
/// A page without tiles yields an empty vector.
pub fn parse_listing(html: &str, page_url: &str) -> Vec<CatalogEntry> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(TILE_SELECTOR) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|tile| parse_tile(&tile, page_url))
        .collect()
}

/// Trimmed text of the first element matching `css`, if non-empty
fn first_text(root: &ElementRef, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    let text = root
        .select(&selector)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();
    (!text.is_empty()).then_some(text)
}

/// First non-blank attribute among `attrs` on the first element matching `css`
fn first_attr(root: &ElementRef, css: &str, attrs: &[&str]) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    let element = root.select(&selector).next()?;
    attrs
        .iter()
        .filter_map(|name| element.value().attr(name))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
