//! HTTP fetcher for weekly blog articles
//!
//! - User-Agent rotation
//! - Rate limiting with governor
//! - Retry with exponential backoff on throttling, server errors and timeouts
//! - Charset-aware decoding with encoding_rs

use crate::config::CrawlerConfig;
use crate::crawler::headers::build_blog_headers;
use crate::utils::error::FetchError;
use crate::utils::retry::{with_retry_if, RetryConfig};
use encoding_rs::{Encoding, UTF_8};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use rand::seq::SliceRandom;
use reqwest::{header::CONTENT_TYPE, Client, Response, StatusCode};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

/// Pool of realistic User-Agent strings for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
];

/// Bytes scanned for a `<meta charset>` when the header has none
const META_SNIFF_BYTES: usize = 1024;

/// Kobo blog fetcher
pub struct BlogFetcher {
    client: Client,

    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    retry: RetryConfig,

    referer: String,

    /// Fixed User-Agent instead of the rotating pool
    user_agent: Option<String>,

    /// Optional base URL override for testing with mock servers
    base_url: Option<String>,
}

impl BlogFetcher {
    /// Create a fetcher from crawler settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(config: &CrawlerConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::direct(quota_for(config.rate_limit)),
            retry: RetryConfig::with_delays(
                config.max_retries,
                config.retry_base_delay_ms,
                config.retry_base_delay_ms.saturating_mul(30),
            ),
            referer: config.blog_referer.clone(),
            user_agent: config.user_agent.clone(),
            base_url: None,
        })
    }

    /// Create a fetcher that resolves relative paths against `base_url`
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_base_url(base_url: &str, config: &CrawlerConfig) -> Result<Self, FetchError> {
        let mut fetcher = Self::new(config)?;
        fetcher.base_url = Some(base_url.trim_end_matches('/').to_string());
        Ok(fetcher)
    }

    /// Fetch a page as text; every attempt waits for the rate limiter
    ///
    /// # Errors
    ///
    /// - `FetchError::NotFound` on 404, without retrying
    /// - `FetchError::MaxRetriesExceeded` when every attempt hit a transient failure
    /// - `FetchError::ServerError` for other non-success statuses
    /// - `FetchError::Decode` when the body does not decode in its charset
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let full_url = self.resolve(url);
        let result = with_retry_if(
            &self.retry,
            |attempt| {
                let full_url = full_url.clone();
                async move {
                    self.rate_limiter.until_ready().await;
                    debug!(url = %full_url, attempt, "Fetching");
                    self.fetch_once(&full_url).await
                }
            },
            is_transient,
        )
        .await;

        result.map_err(|e| match e {
            FetchError::ServerError(status) if Self::should_retry(status) => {
                FetchError::MaxRetriesExceeded(Some(status))
            }
            FetchError::Timeout => FetchError::MaxRetriesExceeded(None),
            other => other,
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let headers = build_blog_headers(self.pick_user_agent(), &self.referer);

        let response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { FetchError::Timeout } else { FetchError::Http(e) })?;

        let status = response.status();
        if status.is_success() {
            return self.decode_response(response).await;
        }
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }
        Err(FetchError::ServerError(status.as_u16()))
    }

    fn resolve(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) if url.starts_with('/') => format!("{base}{url}"),
            _ => url.to_string(),
        }
    }

    /// Determine if a status code should trigger a retry
    ///
    /// 403 is included: the CDN answers bursts with 403 before it starts
    /// sending 429.
    pub fn should_retry(status: u16) -> bool {
        matches!(status, 403 | 429 | 500 | 502 | 503 | 504)
    }

    async fn decode_response(&self, response: Response) -> Result<String, FetchError> {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_default();

        let bytes = response.bytes().await?;
        self.decode_bytes(&bytes, &content_type)
    }

    /// Decode a body using the charset from `Content-Type`, then from a
    /// `<meta charset>` near the top of the page, then UTF-8
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Decode` if the bytes are invalid in that charset
    pub fn decode_bytes(&self, bytes: &[u8], content_type: &str) -> Result<String, FetchError> {
        let encoding = charset_label(content_type)
            .or_else(|| sniff_meta_charset(bytes))
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);

        let (text, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            return Err(FetchError::Decode(format!(
                "invalid {} content",
                encoding.name()
            )));
        }

        Ok(text.into_owned())
    }

    fn pick_user_agent(&self) -> &str {
        match &self.user_agent {
            Some(agent) => agent,
            None => random_user_agent(),
        }
    }
}

fn is_transient(error: &FetchError) -> bool {
    match error {
        FetchError::ServerError(status) => BlogFetcher::should_retry(*status),
        FetchError::Timeout => true,
        FetchError::Http(e) => e.is_connect(),
        _ => false,
    }
}

/// Requests per second as a governor quota; fractional rates become a period
fn quota_for(rate_limit: f64) -> Quota {
    if rate_limit >= 1.0 {
        let per_second = NonZeroU32::new(rate_limit as u32).unwrap_or(NonZeroU32::MIN);
        return Quota::per_second(per_second);
    }

    Some(rate_limit)
        .filter(|r| r.is_finite() && *r > 0.0)
        .and_then(|r| Quota::with_period(Duration::from_secs_f64(1.0 / r)))
        .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
}

fn charset_label(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|label| !label.is_empty())
}

fn sniff_meta_charset(bytes: &[u8]) -> Option<String> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(META_SNIFF_BYTES)]).to_lowercase();
    let start = head.find("charset=")? + "charset=".len();
    let label: String = head[start..]
        .trim_start_matches(['"', '\''])
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    (!label.is_empty()).then_some(label)
}

/// Get a random user agent from the pool
fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS.choose(&mut rng).copied().unwrap_or(USER_AGENTS[0])
}
