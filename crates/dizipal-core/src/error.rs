//! Error types for the DiziPal scraper
//!
//! Provides a single error enum with human-readable messages
//! and Tauri-compatible serialization.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Error type for all DiziPal scraper operations
///
/// Implements Display for human-readable messages and Serialize
/// for Tauri command compatibility.
#[derive(Error, Debug)]
pub enum DizipalError {
    /// Transport-level failure (connection, TLS, body read)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request did not complete within the configured timeout
    #[error("Network error: request timed out: {0}")]
    Timeout(String),

    /// Server answered with a non-success status
    #[error("Network error: HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// A challenge page was detected and could not be bypassed
    #[error("Challenge bypass failed: {0}")]
    BypassFailed(String),

    /// Search endpoint returned a body of unexpected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// No extraction strategy produced a playable URL
    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    /// Catalog section id is not configured
    #[error("Unknown section: {0}")]
    UnknownSection(String),

    /// Caller supplied an unusable query or page index
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl DizipalError {
    /// Whether a host should present this failure as "no results"
    /// instead of "unable to load".
    pub fn is_no_results(&self) -> bool {
        matches!(self, DizipalError::MalformedResponse(_))
    }

    /// Whether the failure came from the network layer (including timeouts).
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            DizipalError::Network(_) | DizipalError::Timeout(_) | DizipalError::HttpStatus { .. }
        )
    }
}

impl Serialize for DizipalError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result type alias for DiziPal operations
pub type Result<T> = std::result::Result<T, DizipalError>;
