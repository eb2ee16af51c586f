//! Retry utilities for resilient operations
//!
//! A small exponential-backoff helper shared by the blog fetcher and anything
//! else that talks to the network.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (the first attempt is not counted)
    pub max_retries: u32,

    /// Base delay in milliseconds for exponential backoff
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff (default: 2.0)
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom max retries
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Create a retry configuration with custom delays
    pub fn with_delays(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
            backoff_multiplier: 2.0,
        }
    }

    /// Delay before the given attempt; attempt 0 never waits
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay_ms = if attempt == 0 {
            0
        } else {
            let exponential =
                self.base_delay_ms as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);
            (exponential as u64).min(self.max_delay_ms)
        };

        Duration::from_millis(delay_ms)
    }
}

/// Execute an operation with exponential backoff, retrying only errors the
/// predicate accepts.
///
/// The operation receives the zero-based attempt number. On exhaustion, or on
/// the first error the predicate rejects, the last error is returned as is.
///
/// ```no_run
/// use kobo99::utils::retry::{with_retry_if, RetryConfig};
///
/// # async fn demo() -> Result<u32, String> {
/// let config = RetryConfig::with_delays(2, 10, 100);
/// with_retry_if(
///     &config,
///     |attempt| async move { if attempt < 1 { Err("busy".to_string()) } else { Ok(7) } },
///     |e: &String| e == "busy",
/// )
/// .await
/// # }
/// ```
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = config.delay_for(attempt);
            debug!(
                attempt = attempt,
                delay_ms = delay.as_millis(),
                "Retrying operation after delay"
            );
            tokio::time::sleep(delay).await;
        }

        match operation(attempt).await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(attempt = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                if !should_retry(&e) {
                    debug!(error = %e, "Error is not retryable");
                    return Err(e);
                }
                warn!(
                    attempt = attempt,
                    max_retries = config.max_retries,
                    error = %e,
                    "Operation failed"
                );
                if attempt >= config.max_retries {
                    return Err(e);
                }
            }
        }

        attempt += 1;
    }
}
