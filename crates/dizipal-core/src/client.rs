//! Challenge-aware HTTP client for DiziPal
//!
//! Every request goes through a rate limiter and, unless marked uncached,
//! the shared response cache.
//! Responses from "risky" listing paths are inspected for an anti-bot
//! challenge marker; a marked response is discarded and the request is
//! re-issued exactly once through the configured [`ChallengeBypass`].

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue};
use parking_lot::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::bypass::{ChallengeBypass, NoBypass};
use crate::cache::{DEFAULT_CAPACITY_BYTES, ResponseCache};
use crate::error::{DizipalError, Result};
use crate::types::ChallengeState;
use crate::url::{BASE_URL, path_of};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36";

/// Accept header sent with page requests
pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Site origin (default: `https://dizipal953.com`)
    pub base_url: String,
    /// User-Agent sent with every request
    pub user_agent: String,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Maximum requests per second (default: 2.0)
    pub requests_per_second: f64,
    /// Path fragments whose responses are inspected for challenges
    pub risky_paths: Vec<String>,
    /// Text identifying a challenge page (default: "Just a moment")
    pub challenge_marker: String,
    /// How much of a body is inspected for the marker (default: 512 KiB)
    pub inspect_limit_bytes: usize,
    /// Response cache budget in bytes (default: 10 MiB)
    pub cache_capacity_bytes: usize,
    /// Where the cache snapshot lives, if persisted
    pub cache_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
            timeout_secs: 30,
            requests_per_second: 2.0,
            risky_paths: vec![
                "/diziler".to_string(),
                "/filmler".to_string(),
                "/koleksiyon".to_string(),
            ],
            challenge_marker: "Just a moment".to_string(),
            inspect_limit_bytes: 512 * 1024,
            cache_capacity_bytes: DEFAULT_CAPACITY_BYTES,
            cache_path: None,
        }
    }
}

/// Spaces outbound requests at least `min_interval` apart
///
/// Each caller reserves the next free slot under a short lock and then sleeps
/// until that slot without holding it, so concurrent callers queue up in
/// reservation order.
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RateLimiter {
    /// Non-positive rates disable spacing.
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = if requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };
        Self {
            min_interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Waits for this caller's slot
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let slot = {
            let mut next = self.next_slot.lock();
            let slot = (*next).max(Instant::now());
            *next = slot + self.min_interval;
            slot
        };

        sleep_until(slot).await;
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// HTTP method of a [`PageRequest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// An outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Form fields, sent url-encoded for POST
    pub form: Vec<(String, String)>,
    /// Whether the response cache may serve or store this request
    pub cacheable: bool,
}

impl PageRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            form: Vec::new(),
            cacheable: true,
        }
    }

    pub fn post_form(url: impl Into<String>, form: Vec<(String, String)>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            form,
            cacheable: true,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Always fetch live and never store the response
    pub fn uncached(mut self) -> Self {
        self.cacheable = false;
        self
    }

    /// Url-encoded form body (empty for requests without fields)
    pub fn form_body(&self) -> String {
        if self.form.is_empty() {
            return String::new();
        }
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.form.iter())
            .finish()
    }

    /// Request identity used as the cache key
    pub fn cache_key(&self) -> String {
        format!("{} {} {}", self.method, self.url, self.form_body())
    }
}

/// A response body together with how it was obtained
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub body: String,
    pub challenge: ChallengeState,
    pub from_cache: bool,
}

/// HTTP client with challenge detection, caching and rate limiting
///
/// Handles all HTTP communication for the scraper:
/// - Rate limiting to avoid overwhelming the server
/// - One-shot challenge bypass on risky listing paths
/// - Byte-bounded LRU cache of clean responses
pub struct DizipalClient {
    client: reqwest::Client,
    rate_limiter: RateLimiter,
    cache: ResponseCache,
    bypass: Arc<dyn ChallengeBypass>,
    config: ClientConfig,
}

impl DizipalClient {
    /// Create a new client with default configuration and no bypass
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration and no bypass
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Self::with_bypass(config, Arc::new(NoBypass))
    }

    /// Create a new client with custom configuration and bypass strategy
    pub fn with_bypass(config: ClientConfig, bypass: Arc<dyn ChallengeBypass>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("tr-TR,tr;q=0.9,en;q=0.8"),
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .cookie_store(true)
            .default_headers(headers)
            .build()
            .map_err(DizipalError::Network)?;

        let cache = match &config.cache_path {
            Some(path) => ResponseCache::load(path, config.cache_capacity_bytes),
            None => ResponseCache::new(config.cache_capacity_bytes),
        };

        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(config.requests_per_second),
            cache,
            bypass,
            config,
        })
    }

    /// Fetch a request, serving clean cached bodies when available
    ///
    /// Only live responses that carry no challenge marker are stored. A body
    /// obtained through the bypass is returned but never cached, so the next
    /// call for the same request goes to the network again.
    ///
    /// # Errors
    /// - `Network` / `Timeout` / `HttpStatus` - transport failures
    /// - `BypassFailed` - challenge detected and the bypass could not clear it
    pub async fn fetch(&self, request: &PageRequest) -> Result<FetchedPage> {
        let key = request.cache_key();

        if let Some(body) = request.cacheable.then(|| self.cache.get(&key)).flatten() {
            debug!(method = %request.method, url = %request.url, "cache hit");
            return Ok(FetchedPage {
                url: request.url.clone(),
                body,
                challenge: ChallengeState::default(),
                from_cache: true,
            });
        }

        let (status, body) = self.send(request).await?;

        let marked = self.has_challenge_marker(&body);

        if marked && self.is_risky(&request.url) {
            info!(url = %request.url, bypass = self.bypass.name(), "challenge page detected, bypassing");

            let solved = self.bypass.solve(request).await.inspect_err(|e| {
                warn!(url = %request.url, error = %e, "challenge bypass failed");
            })?;

            if self.has_challenge_marker(&solved) {
                warn!(url = %request.url, "bypass returned another challenge page");
                return Err(DizipalError::BypassFailed(format!(
                    "{} still returned a challenge page for {}",
                    self.bypass.name(),
                    request.url
                )));
            }

            return Ok(FetchedPage {
                url: request.url.clone(),
                body: solved,
                challenge: ChallengeState {
                    triggered: true,
                    bypass_attempted: true,
                },
                from_cache: false,
            });
        }

        if !status.is_success() {
            return Err(DizipalError::HttpStatus {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }

        if marked {
            // Non-risky paths pass through, but a trapped page is never replayed
            debug!(url = %request.url, "challenge marker on pass-through response, not caching");
        } else if request.cacheable && !self.cache.insert(key, body.clone()) {
            debug!(url = %request.url, bytes = body.len(), "response too large to cache");
        }

        Ok(FetchedPage {
            url: request.url.clone(),
            body,
            challenge: ChallengeState::default(),
            from_cache: false,
        })
    }

    /// Fetch a request and return only the body
    pub async fn fetch_text(&self, request: &PageRequest) -> Result<String> {
        self.fetch(request).await.map(|page| page.body)
    }

    /// Whether the URL's path matches one of the risky path fragments
    pub fn is_risky(&self, url: &str) -> bool {
        let Some(path) = path_of(url) else {
            return false;
        };
        self.config
            .risky_paths
            .iter()
            .any(|risky| !risky.is_empty() && path.contains(risky.as_str()))
    }

    /// Looks for the challenge marker within the inspection budget
    pub fn has_challenge_marker(&self, body: &str) -> bool {
        let marker = self.config.challenge_marker.as_bytes();
        if marker.is_empty() {
            return false;
        }
        let limit = body.len().min(self.config.inspect_limit_bytes);
        body.as_bytes()[..limit]
            .windows(marker.len())
            .any(|window| window == marker)
    }

    /// Perform a single network round trip
    async fn send(&self, request: &PageRequest) -> Result<(reqwest::StatusCode, String)> {
        self.rate_limiter.acquire().await;
        debug!(method = %request.method, url = %request.url, "fetching");

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self
                .client
                .post(&request.url)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded; charset=UTF-8")
                .body(request.form_body()),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(e, &request.url))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, &request.url))?;

        Ok((status, body))
    }

    /// Write the cache snapshot to `cache_path`, if one is configured
    ///
    /// Writes to a sibling temp file first so a crash never leaves a
    /// half-written snapshot behind.
    pub async fn persist_cache(&self) -> std::io::Result<()> {
        let Some(path) = &self.config.cache_path else {
            return Ok(());
        };

        let json = self.cache.to_snapshot_json().map_err(std::io::Error::other)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!(path = %path.display(), entries = self.cache.len(), "cache snapshot written");
        Ok(())
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get a reference to the rate limiter (for testing)
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}

fn transport_error(error: reqwest::Error, url: &str) -> DizipalError {
    if error.is_timeout() {
        DizipalError::Timeout(url.to_string())
    } else {
        DizipalError::Network(error)
    }
}
