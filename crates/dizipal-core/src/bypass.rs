//! Challenge bypass strategies
//!
//! A bypass receives the request whose response was a challenge page and
//! must either return the real page body or fail with `BypassFailed`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::{Method, PageRequest};
use crate::error::{DizipalError, Result};

/// Capability that solves or routes around an anti-bot interstitial
#[async_trait]
pub trait ChallengeBypass: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Re-issues `request` and returns a clean response body
    async fn solve(&self, request: &PageRequest) -> Result<String>;
}

/// Bypass that always gives up
///
/// Used when no solver is configured, so a challenge surfaces as
/// `BypassFailed` instead of a trapped page.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBypass;

#[async_trait]
impl ChallengeBypass for NoBypass {
    fn name(&self) -> &str {
        "none"
    }

    async fn solve(&self, request: &PageRequest) -> Result<String> {
        Err(DizipalError::BypassFailed(format!(
            "no bypass configured for {}",
            request.url
        )))
    }
}

const FIRECRAWL_ENDPOINT: &str = "https://api.firecrawl.dev/v1/scrape";

#[derive(Serialize)]
struct FirecrawlRequest<'a> {
    url: &'a str,
    formats: [&'static str; 1],
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    headers: HashMap<&'a str, &'a str>,
}

#[derive(Deserialize)]
struct FirecrawlResponse {
    #[serde(default)]
    success: bool,
    data: Option<FirecrawlData>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct FirecrawlData {
    html: Option<String>,
}

/// Re-fetches pages through the Firecrawl rendering API
///
/// Only GET pages can be rendered; form posts are rejected. The render call
/// is bounded by the timeout given at construction.
pub struct FirecrawlBypass {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    timeout: Duration,
}

impl FirecrawlBypass {
    /// Create a bypass using the public Firecrawl endpoint
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::with_endpoint(api_key, FIRECRAWL_ENDPOINT, timeout)
    }

    /// Create a bypass against a custom endpoint (self-hosted or mock)
    pub fn with_endpoint(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DizipalError::Network)?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            timeout,
        })
    }

    /// Build from `FIRECRAWL_API_KEY`, if set and non-empty
    pub fn from_env(timeout: Duration) -> Option<Self> {
        match std::env::var("FIRECRAWL_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Self::new(key.trim(), timeout).ok(),
            _ => None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl ChallengeBypass for FirecrawlBypass {
    fn name(&self) -> &str {
        "firecrawl"
    }

    async fn solve(&self, request: &PageRequest) -> Result<String> {
        if request.method != Method::Get {
            return Err(DizipalError::BypassFailed(format!(
                "firecrawl cannot replay {} {}",
                request.method, request.url
            )));
        }

        let payload = FirecrawlRequest {
            url: &request.url,
            formats: ["html"],
            headers: request
                .headers
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
        };

        debug!(url = %request.url, "solving challenge via firecrawl");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DizipalError::BypassFailed(format!(
                        "firecrawl timed out after {}s",
                        self.timeout.as_secs()
                    ))
                } else {
                    DizipalError::BypassFailed(format!("firecrawl request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "firecrawl rejected the request");
            return Err(DizipalError::BypassFailed(format!(
                "firecrawl returned HTTP {}",
                status.as_u16()
            )));
        }

        let parsed: FirecrawlResponse = response
            .json()
            .await
            .map_err(|e| DizipalError::BypassFailed(format!("firecrawl response parse error: {}", e)))?;

        if !parsed.success {
            return Err(DizipalError::BypassFailed(
                parsed.error.unwrap_or_else(|| "firecrawl reported failure".to_string()),
            ));
        }

        parsed
            .data
            .and_then(|d| d.html)
            .filter(|html| !html.is_empty())
            .ok_or_else(|| DizipalError::BypassFailed("firecrawl returned no html".to_string()))
    }
}
