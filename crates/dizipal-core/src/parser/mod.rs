//! Text parsers for DiziPal and its video hosts
//!
//! Contains modules for parsing different page types. Parsers do no I/O.

pub mod listing;
pub mod search;
pub mod stream;

pub use listing::{parse_listing, parse_tile};
pub use search::parse_search_response;
pub use stream::{
    AvHexStrategy, DecodeError, ExtractionStrategy, HexEscapeStrategy, default_strategies,
    extract_stream_url, parse_stream_page, parse_subtitles,
};
