//! Video page deobfuscation for RapidVid-style players
//!
//! The player script hides the media URL behind hex encoding. Extraction runs
//! an ordered chain of [`ExtractionStrategy`]s: the first strategy whose
//! pattern is present on the page owns the result, and a payload that fails
//! to decode is an error rather than a cue to try the next strategy.
//!
//! Subtitles are scanned independently and never make resolution fail.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use hex::{FromHex, FromHexError};
use regex::Regex;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::error::{DizipalError, Result};
use crate::types::{MediaFormat, Quality, ResolvedStream, StreamDescriptor, SubtitleTrack};
use crate::url::absolutize;

/// Name reported in [`StreamDescriptor::source_name`]
pub const EXTRACTOR_NAME: &str = "RapidVid";

/// Why a located payload could not be turned into a URL
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload is empty")]
    Empty,

    #[error("odd number of hex digits ({0})")]
    OddLength(usize),

    #[error("invalid hex group {0:?}")]
    InvalidHex(String),

    #[error("decoded bytes are not UTF-8")]
    InvalidUtf8,

    #[error("decoded text is not an http(s) URL: {0:?}")]
    NotAUrl(String),
}

/// One way of locating and decoding the media URL in a page
pub trait ExtractionStrategy: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Finds the encoded payload, if this strategy's pattern is on the page
    fn locate<'a>(&self, page: &'a str) -> Option<&'a str>;

    /// Decodes a located payload into an absolute URL
    fn decode(&self, payload: &str) -> std::result::Result<String, DecodeError>;
}

/// Primary pattern: `file": "\x68\x74...",` holding `\xHH` escapes
#[derive(Debug, Clone, Copy, Default)]
pub struct HexEscapeStrategy;

impl ExtractionStrategy for HexEscapeStrategy {
    fn name(&self) -> &'static str {
        "hex-escape"
    }

    fn locate<'a>(&self, page: &'a str) -> Option<&'a str> {
        static RE: OnceLock<Option<Regex>> = OnceLock::new();
        let re = RE
            .get_or_init(|| Regex::new(r#"file": "([^"]*)","#).ok())
            .as_ref()?;
        re.captures(page)?.get(1).map(|m| m.as_str())
    }

    fn decode(&self, payload: &str) -> std::result::Result<String, DecodeError> {
        decode_hex_escapes(payload)
    }
}

/// Fallback pattern: `file":"av('6874...')","label` holding bare hex digits
#[derive(Debug, Clone, Copy, Default)]
pub struct AvHexStrategy;

impl ExtractionStrategy for AvHexStrategy {
    fn name(&self) -> &'static str {
        "av-hex"
    }

    fn locate<'a>(&self, page: &'a str) -> Option<&'a str> {
        static RE: OnceLock<Option<Regex>> = OnceLock::new();
        let re = RE
            .get_or_init(|| Regex::new(r#"file":"av\('([^']+)'\)","label"#).ok())
            .as_ref()?;
        re.captures(page)?.get(1).map(|m| m.as_str())
    }

    fn decode(&self, payload: &str) -> std::result::Result<String, DecodeError> {
        decode_hex_digits(payload)
    }
}

/// The built-in strategy chain, in priority order
pub fn default_strategies() -> Vec<Box<dyn ExtractionStrategy>> {
    vec![Box::new(HexEscapeStrategy), Box::new(AvHexStrategy)]
}

/// Decodes a sequence of `\xHH` tokens
///
/// Splits on the `\x` marker, drops empty fragments, and requires every
/// remaining fragment to be exactly two hex digits.
pub fn decode_hex_escapes(payload: &str) -> std::result::Result<String, DecodeError> {
    let bytes = payload
        .split("\\x")
        .filter(|fragment| !fragment.is_empty())
        .map(|fragment| {
            <[u8; 1]>::from_hex(fragment)
                .map(|[byte]| byte)
                .map_err(|_| DecodeError::InvalidHex(fragment.to_string()))
        })
        .collect::<std::result::Result<Vec<u8>, _>>()?;

    bytes_to_url(bytes)
}

/// Decodes a bare hex digit string, two digits per byte
///
/// `\\x` / `\x` markers and whitespace left over from escaping are removed
/// first; anything else that is not a hex digit is an error.
pub fn decode_hex_digits(payload: &str) -> std::result::Result<String, DecodeError> {
    let cleaned: String = payload
        .replace("\\\\x", "")
        .replace("\\x", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let bytes = hex::decode(&cleaned).map_err(|e| match e {
        FromHexError::OddLength => DecodeError::OddLength(cleaned.len()),
        FromHexError::InvalidHexCharacter { c, .. } => DecodeError::InvalidHex(c.to_string()),
        other => DecodeError::InvalidHex(other.to_string()),
    })?;

    bytes_to_url(bytes)
}

fn bytes_to_url(bytes: Vec<u8>) -> std::result::Result<String, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    let text = String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;

    match Url::parse(&text) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(text),
        _ => Err(DecodeError::NotAUrl(text)),
    }
}

/// Runs the strategy chain over a page
///
/// # Returns
/// The winning strategy's name and the decoded URL
///
/// # Errors
/// Returns `StreamNotFound` if no pattern is present, or if the first
/// present pattern's payload fails to decode
pub fn extract_stream_url(
    page: &str,
    strategies: &[Box<dyn ExtractionStrategy>],
) -> Result<(&'static str, String)> {
    for strategy in strategies {
        let Some(payload) = strategy.locate(page) else {
            continue;
        };

        debug!(strategy = strategy.name(), "stream payload located");
        return strategy
            .decode(payload)
            .map(|url| (strategy.name(), url))
            .map_err(|e| {
                DizipalError::StreamNotFound(format!("{} payload: {}", strategy.name(), e))
            });
    }

    Err(DizipalError::StreamNotFound(
        "no extraction strategy matched the page".to_string(),
    ))
}

/// Extracts subtitle tracks from a player script
///
/// Tracks are deduplicated on the raw captured URL, keeping the first
/// occurrence. Tracks whose URL cannot be made absolute are skipped.
pub fn parse_subtitles(page: &str, page_url: &str) -> Vec<SubtitleTrack> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = RE
        .get_or_init(|| Regex::new(r#"captions","file":"([^"]+)","label":"([^"]+)""#).ok())
        .as_ref()
    else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut tracks = Vec::new();

    for caps in re.captures_iter(page) {
        let (Some(raw_url), Some(raw_label)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if !seen.insert(raw_url.as_str()) {
            continue;
        }

        let Some(url) = absolutize(page_url, &raw_url.as_str().replace('\\', "")) else {
            continue;
        };

        tracks.push(SubtitleTrack {
            language_label: unescape_unicode(raw_label.as_str()),
            url,
        });
    }

    tracks
}

/// Resolves literal `\uXXXX` escapes (including surrogate pairs)
///
/// Malformed escapes are left untouched.
pub fn unescape_unicode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find("\\u") {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 2..];

        let Some(unit) = parse_code_unit(after) else {
            out.push_str("\\u");
            rest = after;
            continue;
        };

        if (0xD800..0xDC00).contains(&unit) {
            let tail = &after[4..];
            let low = tail
                .strip_prefix("\\u")
                .and_then(parse_code_unit)
                .filter(|low| (0xDC00..0xE000).contains(low));
            if let Some(ch) =
                low.and_then(|low| char::from_u32(0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00)))
            {
                out.push(ch);
                rest = &tail[6..];
                continue;
            }
        }

        match char::from_u32(unit) {
            Some(ch) => out.push(ch),
            None => out.push_str(&rest[pos..pos + 6]),
        }
        rest = &after[4..];
    }

    out.push_str(rest);
    out
}

fn parse_code_unit(s: &str) -> Option<u32> {
    let hex = s.get(..4)?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

/// Guesses the delivery format from the URL path, defaulting to HLS
pub fn infer_media_format(url: &str) -> MediaFormat {
    let path = Url::parse(url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_else(|_| url.to_lowercase());

    match path.rsplit('.').next() {
        Some("mp4" | "mkv" | "webm" | "mov" | "avi" | "m4v") => MediaFormat::Progressive,
        _ => MediaFormat::Hls,
    }
}

/// Finds a resolution marker like "1080p" or "4K" in the URL
pub fn infer_quality(url: &str) -> Option<Quality> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = RE
        .get_or_init(|| Regex::new(r"(?:^|[^0-9])(\d{3,4})[pP](?:[^0-9a-zA-Z]|$)").ok())
        .as_ref();

    if let Some(height) = re
        .and_then(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
    {
        return Quality::from_height(height);
    }
    if url.contains("4K") || url.contains("4k") {
        return Some(Quality::P2160);
    }
    None
}

/// Turns a fetched video page into subtitles plus a stream descriptor
///
/// # Arguments
/// * `page` - Raw page text
/// * `page_url` - URL the page was fetched from
/// * `referer` - Referer used for the fetch; the player must send it too
/// * `strategies` - Extraction chain, tried in order
///
/// # Errors
/// Returns `StreamNotFound` if the chain yields no URL
pub fn parse_stream_page(
    page: &str,
    page_url: &str,
    referer: &str,
    strategies: &[Box<dyn ExtractionStrategy>],
) -> Result<ResolvedStream> {
    let subtitles = parse_subtitles(page, page_url);
    let (strategy, source_url) = extract_stream_url(page, strategies)?;
    debug!(strategy, url = %source_url, subtitles = subtitles.len(), "stream decoded");

    let mut required_headers = BTreeMap::new();
    required_headers.insert("Referer".to_string(), referer.to_string());

    Ok(ResolvedStream {
        subtitles,
        stream: StreamDescriptor {
            source_name: EXTRACTOR_NAME.to_string(),
            media_format: infer_media_format(&source_url),
            quality_hint: infer_quality(&source_url),
            source_url,
            required_headers,
        },
    })
}
