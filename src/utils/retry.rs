//! Retry logic for player fetches

use crate::error::SigError;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries
    pub max_retries: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Backoff multiplier
    pub backoff_multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    /// Set maximum retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set initial delay
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    /// Set jitter factor, clamped to 0.0..=1.0
    pub fn with_jitter_factor(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor.clamp(0.0, 1.0);
        self
    }
}

/// Retry executor
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create a new retry executor
    pub fn new() -> Self {
        Self::with_config(RetryConfig::default())
    }

    /// Create a new retry executor with configuration
    pub fn with_config(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `func` until it succeeds, fails with a non-retryable error, or retries run out
    pub async fn execute<F, Fut, T>(&self, mut func: F) -> Result<T, SigError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SigError>>,
    {
        let mut delay = self.config.initial_delay;
        let mut attempt = 0;

        loop {
            let error = match func().await {
                Ok(result) => return Ok(result),
                Err(error) => error,
            };

            if !error.is_retryable() || attempt >= self.config.max_retries {
                return Err(error);
            }
            attempt += 1;

            // Add jitter to prevent thundering herd
            let jitter = if self.config.jitter_factor > 0.0 {
                let jitter_range = delay.as_millis() as f64 * self.config.jitter_factor;
                let jitter = (rand::random::<f64>() - 0.5) * 2.0 * jitter_range;
                Duration::from_millis(jitter.abs() as u64)
            } else {
                Duration::ZERO
            };

            debug!(
                "Attempt {}/{} failed: {}, retrying in {:?}",
                attempt,
                self.config.max_retries,
                error,
                delay + jitter
            );
            tokio::time::sleep(delay + jitter).await;

            delay = Duration::from_millis(
                (delay.as_millis() as f64 * self.config.backoff_multiplier) as u64,
            )
            .min(self.config.max_delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig::default()
            .with_max_retries(max_retries)
            .with_initial_delay(Duration::from_millis(1))
            .with_jitter_factor(0.0)
    }

    fn transient() -> SigError {
        SigError::HttpStatus {
            url: "https://x.test/p.js".to_string(),
            status: 503,
        }
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_delay, Duration::from_millis(200));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert_eq!(config.backoff_multiplier, 2.0);
        assert_eq!(config.jitter_factor, 0.1);
    }

    #[test]
    fn test_jitter_clamping() {
        assert_eq!(RetryConfig::default().with_jitter_factor(1.5).jitter_factor, 1.0);
        assert_eq!(RetryConfig::default().with_jitter_factor(-0.5).jitter_factor, 0.0);
    }

    #[tokio::test]
    async fn test_retry_executor_success_after_failures() {
        let executor = RetryExecutor::with_config(fast_config(3));
        let counter = Arc::new(AtomicU32::new(0));

        let result = executor
            .execute(|| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(transient())
                    } else {
                        Ok("body".to_string())
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "body");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_executor_max_retries() {
        let executor = RetryExecutor::with_config(fast_config(2));
        let counter = Arc::new(AtomicU32::new(0));

        let result: Result<String, SigError> = executor
            .execute(|| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(transient())
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 3); // 1 initial + 2 retries
    }

    #[tokio::test]
    async fn test_retry_executor_non_retryable_error() {
        let executor = RetryExecutor::with_config(fast_config(3));
        let counter = Arc::new(AtomicU32::new(0));

        let result: Result<String, SigError> = executor
            .execute(|| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(SigError::HttpStatus {
                        url: "https://x.test/p.js".to_string(),
                        status: 404,
                    })
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
