//! Autocomplete search response parser for DiziPal
//!
//! The endpoint answers with a JSON object keyed by opaque ids. The keys
//! carry no information, so the object is decoded directly into a sequence
//! of records in document order.

use std::fmt;

use serde::Deserialize;
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};

use crate::error::{DizipalError, Result};
use crate::types::{CatalogEntry, MediaKind};
use crate::url::absolutize;

/// One raw record from the autocomplete endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchRecord {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default, alias = "href", alias = "link")]
    pub url: Option<String>,

    #[serde(default, alias = "image", alias = "thumb")]
    pub poster: Option<String>,

    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl SearchRecord {
    /// Converts to a catalog entry, or `None` if title or link is missing
    pub fn into_entry(self, base_url: &str) -> Option<CatalogEntry> {
        let title = self.title?;
        let detail_url = absolutize(base_url, self.url.as_deref()?)?;
        let poster_url = self.poster.and_then(|p| absolutize(base_url, &p));
        let media_kind = self
            .kind
            .as_deref()
            .and_then(MediaKind::from_label)
            .unwrap_or_else(|| MediaKind::from_detail_url(&detail_url));

        CatalogEntry::new(&title, &detail_url, poster_url, media_kind)
    }
}

/// The values of a keyed search response, keys discarded
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SearchRecords(pub Vec<SearchRecord>);

impl<'de> Deserialize<'de> for SearchRecords {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RecordsVisitor;

        impl<'de> Visitor<'de> for RecordsVisitor {
            type Value = SearchRecords;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping ids to search records")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut records = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((_, record)) = map.next_entry::<IgnoredAny, SearchRecord>()? {
                    records.push(record);
                }
                Ok(SearchRecords(records))
            }

            // PHP backends encode an empty result map as `[]`
            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                if seq.next_element::<IgnoredAny>()?.is_some() {
                    return Err(de::Error::invalid_type(de::Unexpected::Seq, &self));
                }
                Ok(SearchRecords::default())
            }
        }

        deserializer.deserialize_any(RecordsVisitor)
    }
}

/// Parses an autocomplete response body into catalog entries
///
/// # Arguments
/// * `body` - Raw JSON body
/// * `base_url` - Site origin used to resolve relative links
///
/// # Errors
/// Returns `MalformedResponse` if the body is not a keyed object of records
pub fn parse_search_response(body: &str, base_url: &str) -> Result<Vec<CatalogEntry>> {
    let SearchRecords(records) = serde_json::from_str(body)
        .map_err(|e| DizipalError::MalformedResponse(format!("search response: {}", e)))?;

    Ok(records
        .into_iter()
        .filter_map(|record| record.into_entry(base_url))
        .collect())
}
