//! Retry utilities with exponential backoff
//!
//! Transient gateway failures (timeouts, 5xx responses, dropped streams)
//! are worth retrying; template errors and 4xx responses are not. This
//! module provides the backoff loop and the retryability classification.

use crate::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,

    /// Initial delay before first retry
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,

    /// Random jitter fraction added to each delay (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay before the given retry (0-based), jitter included.
    fn delay_for(&self, retry: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(retry as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        let jitter = if self.jitter_factor > 0.0 {
            rand::thread_rng().r#gen::<f64>() * self.jitter_factor * capped
        } else {
            0.0
        };
        Duration::from_secs_f64(capped + jitter)
    }
}

/// Whether an error is worth retrying.
///
/// Transport and stream failures are transient; configuration, template and
/// input errors will fail identically on every attempt.
pub fn is_retryable(error: &Error) -> bool {
    match error {
        Error::Http(_) | Error::Stream(_) | Error::Timeout => true,
        Error::Api(msg) => {
            // Retry server-side failures and rate limits only.
            msg.contains("API error 5") || msg.contains("API error 429")
        }
        _ => false,
    }
}

/// Run an async operation with exponential backoff.
///
/// The operation is attempted up to `config.max_attempts` times; only
/// errors classified by [`is_retryable`] trigger another attempt.
pub async fn retry_with_backoff<T, F, Fut>(config: RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                if attempt >= config.max_attempts || !is_retryable(&e) {
                    return Err(e);
                }
                let delay = config.delay_for(attempt - 1);
                log::debug!("retrying after {delay:?} (attempt {attempt}): {e}");
                sleep(delay).await;
            }
        }
    }
}
