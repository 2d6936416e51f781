//! Core data types for the DiziPal scraper
//!
//! All values here are produced by one call and handed to the caller by value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Kind of title behind a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Series,
    Movie,
}

impl MediaKind {
    /// Infers the kind from a detail URL path
    ///
    /// Movie pages live under `/film/` (single) or `/filmler` (listing);
    /// everything else on the site is a series.
    pub fn from_detail_url(url: &str) -> Self {
        if url.contains("/film/") || url.contains("/filmler") {
            MediaKind::Movie
        } else {
            MediaKind::Series
        }
    }

    /// Parses the `type` field of a search record ("movie", "film", "series", "dizi", ...)
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "movie" | "movies" | "film" | "filmler" => Some(MediaKind::Movie),
            "series" | "tvseries" | "tv" | "dizi" | "diziler" => Some(MediaKind::Series),
            _ => None,
        }
    }
}

/// One title in a listing or a search result
///
/// `title` and `detail_url` are never empty; build through [`CatalogEntry::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Display title
    pub title: String,

    /// Absolute URL of the title's detail page
    pub detail_url: String,

    /// Absolute poster image URL, if the tile carried one
    pub poster_url: Option<String>,

    /// Series or movie
    pub media_kind: MediaKind,
}

impl CatalogEntry {
    /// Builds an entry, returning `None` when title or link is blank
    pub fn new(
        title: &str,
        detail_url: &str,
        poster_url: Option<String>,
        media_kind: MediaKind,
    ) -> Option<Self> {
        let title = title.trim();
        let detail_url = detail_url.trim();
        if title.is_empty() || detail_url.is_empty() {
            return None;
        }

        Some(Self {
            title: title.to_string(),
            detail_url: detail_url.to_string(),
            poster_url: poster_url.filter(|p| !p.trim().is_empty()),
            media_kind,
        })
    }
}

/// One page of a catalog section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPage {
    /// Human-readable section name (e.g. "Yeni Diziler")
    pub section: String,

    /// Entries in document order
    pub entries: Vec<CatalogEntry>,

    /// Whether another page can be requested
    pub has_next: bool,
}

/// A subtitle track discovered on a video page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    /// Human-readable language label with escapes resolved (e.g. "Türkçe")
    pub language_label: String,

    /// Absolute subtitle file URL
    pub url: String,
}

/// Delivery format of a resolved stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    /// HLS playlist (`.m3u8`)
    Hls,
    /// Single progressive file (`.mp4`, `.mkv`, ...)
    Progressive,
}

/// Vertical resolution hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quality {
    P360,
    P480,
    P720,
    P1080,
    P1440,
    P2160,
}

impl Quality {
    /// Maps a pixel height onto a known quality step
    pub fn from_height(height: u32) -> Option<Self> {
        match height {
            360 => Some(Quality::P360),
            480 => Some(Quality::P480),
            720 => Some(Quality::P720),
            1080 => Some(Quality::P1080),
            1440 => Some(Quality::P1440),
            2160 => Some(Quality::P2160),
            _ => None,
        }
    }

    pub fn height(self) -> u32 {
        match self {
            Quality::P360 => 360,
            Quality::P480 => 480,
            Quality::P720 => 720,
            Quality::P1080 => 1080,
            Quality::P1440 => 1440,
            Quality::P2160 => 2160,
        }
    }
}

/// The playable stream recovered from a video page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Name of the extractor that produced this stream
    pub source_name: String,

    /// Decoded absolute media URL
    pub source_url: String,

    pub media_format: MediaFormat,

    /// Headers the player must send; always contains `Referer`
    pub required_headers: BTreeMap<String, String>,

    pub quality_hint: Option<Quality>,
}

/// Result of resolving one video page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedStream {
    /// Subtitle tracks in page order, first occurrence wins
    pub subtitles: Vec<SubtitleTrack>,

    pub stream: StreamDescriptor,
}

/// Per-request record of challenge handling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChallengeState {
    /// The response carried the challenge marker
    pub triggered: bool,

    /// The bypass strategy was invoked
    pub bypass_attempted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_entry_requires_title_and_link() {
        assert!(CatalogEntry::new("", "https://x/dizi/a", None, MediaKind::Series).is_none());
        assert!(CatalogEntry::new("  ", "https://x/dizi/a", None, MediaKind::Series).is_none());
        assert!(CatalogEntry::new("Title", "", None, MediaKind::Series).is_none());

        let entry = CatalogEntry::new(" Title ", "https://x/dizi/a", None, MediaKind::Series)
            .expect("valid entry");
        assert_eq!(entry.title, "Title");
    }

    #[test]
    fn test_catalog_entry_drops_blank_poster() {
        let entry = CatalogEntry::new(
            "Title",
            "https://x/dizi/a",
            Some(" ".to_string()),
            MediaKind::Series,
        )
        .expect("valid entry");
        assert_eq!(entry.poster_url, None);
    }

    #[test]
    fn test_media_kind_from_detail_url() {
        assert_eq!(
            MediaKind::from_detail_url("https://dizipal953.com/film/inception"),
            MediaKind::Movie
        );
        assert_eq!(
            MediaKind::from_detail_url("https://dizipal953.com/dizi/dark"),
            MediaKind::Series
        );
    }

    #[test]
    fn test_media_kind_from_label() {
        assert_eq!(MediaKind::from_label("Movie"), Some(MediaKind::Movie));
        assert_eq!(MediaKind::from_label("dizi"), Some(MediaKind::Series));
        assert_eq!(MediaKind::from_label("anime"), None);
    }

    #[test]
    fn test_quality_from_height() {
        assert_eq!(Quality::from_height(1080), Some(Quality::P1080));
        assert_eq!(Quality::from_height(999), None);
        assert_eq!(Quality::P2160.height(), 2160);
    }

    #[test]
    fn test_resolved_stream_serialization() {
        let mut headers = BTreeMap::new();
        headers.insert("Referer".to_string(), "https://dizipal953.com/".to_string());
        let resolved = ResolvedStream {
            subtitles: vec![SubtitleTrack {
                language_label: "Türkçe".to_string(),
                url: "https://rapidvid.net/sub/tr.vtt".to_string(),
            }],
            stream: StreamDescriptor {
                source_name: "RapidVid".to_string(),
                source_url: "https://a.m3u8".to_string(),
                media_format: MediaFormat::Hls,
                required_headers: headers,
                quality_hint: None,
            },
        };

        let json = serde_json::to_string(&resolved).expect("Serialization should succeed");
        assert!(json.contains("\"media_format\":\"hls\""));
        let back: ResolvedStream =
            serde_json::from_str(&json).expect("Deserialization should succeed");
        assert_eq!(resolved, back);
    }
}
