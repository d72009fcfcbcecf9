//! Randomized-wait retries for completion calls.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use threadline_types::{
    CompletionRequest, CompletionResponse, CompletionService, ProviderError, ProviderErrorKind,
};

/// When and how long to wait before retrying a failed call.
///
/// Each wait is drawn uniformly from `[min_wait, max_wait]`. Deserializing
/// fills missing fields from [`Default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Shortest wait between attempts.
    pub min_wait: Duration,
    /// Longest wait between attempts.
    pub max_wait: Duration,
    /// Total attempts, the first call included. Zero behaves as one.
    pub retry_count: usize,
    /// Error kinds worth another attempt. Only transient errors
    /// ([`ProviderError::is_retryable`]) qualify, whatever the list says;
    /// anything else fails at once.
    pub retryable: Vec<ProviderErrorKind>,
    /// Use the provider's `retry_after` hint, clamped to the wait range,
    /// instead of a random draw.
    pub honor_retry_after: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_wait: Duration::from_secs(61),
            max_wait: Duration::from_secs(240),
            retry_count: 5,
            retryable: vec![ProviderErrorKind::RateLimit],
            honor_retry_after: true,
        }
    }
}

impl RetryConfig {
    /// A single attempt, no retries.
    #[must_use]
    pub fn none() -> Self {
        Self { retry_count: 1, ..Self::default() }
    }

    /// Sets the wait range. The bounds are reordered if given backwards.
    #[must_use]
    pub fn with_wait(mut self, min_wait: Duration, max_wait: Duration) -> Self {
        self.min_wait = min_wait.min(max_wait);
        self.max_wait = min_wait.max(max_wait);
        self
    }

    /// Sets the total number of attempts.
    #[must_use]
    pub fn with_retry_count(mut self, retry_count: usize) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Sets which error kinds are retried.
    #[must_use]
    pub fn with_retryable(mut self, kinds: impl IntoIterator<Item = ProviderErrorKind>) -> Self {
        self.retryable = kinds.into_iter().collect();
        self
    }

    /// Total attempts, never less than one.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.retry_count.max(1)
    }

    /// Whether `error` qualifies for another attempt.
    #[must_use]
    pub fn retries(&self, error: &ProviderError) -> bool {
        error.is_retryable() && self.retryable.contains(&error.kind())
    }

    fn bounds(&self) -> (Duration, Duration) {
        (self.min_wait.min(self.max_wait), self.min_wait.max(self.max_wait))
    }

    /// The wait before the next attempt after `error`.
    fn delay_after(&self, error: &ProviderError) -> Duration {
        let (lo, hi) = self.bounds();
        if self.honor_retry_after {
            if let ProviderError::RateLimit { retry_after: Some(hint) } = error {
                return (*hint).clamp(lo, hi);
            }
        }
        let lo_ms = u64::try_from(lo.as_millis()).unwrap_or(u64::MAX);
        let hi_ms = u64::try_from(hi.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::thread_rng().gen_range(lo_ms..=hi_ms))
    }
}

/// Runs fallible operations under a [`RetryConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetryScheduler {
    config: RetryConfig,
}

impl RetryScheduler {
    /// Creates a scheduler for `config`.
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Calls `operation` until it succeeds, fails with a kind outside
    /// [`RetryConfig::retryable`], or runs out of attempts.
    ///
    /// Sleeps only between attempts, never after the last one.
    ///
    /// # Errors
    ///
    /// Returns a non-retryable error unchanged as soon as it occurs, or
    /// [`ProviderError::RetryExhausted`] wrapping the final error once every
    /// attempt has failed.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let attempts = self.config.attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "threadline.retry.recovered");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !self.config.retries(&error) {
                return Err(error);
            }
            if attempt >= attempts {
                tracing::error!(attempts, error = %error, "threadline.retry.exhausted");
                return Err(ProviderError::RetryExhausted { attempts, last: Box::new(error) });
            }

            let delay = self.config.delay_after(&error);
            tracing::warn!(
                attempt,
                max_attempts = attempts,
                delay_secs = delay.as_secs_f64(),
                error = %error,
                "threadline.retry.waiting"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// A [`CompletionService`] that retries the one it wraps.
///
/// # Example
///
/// ```no_run
/// # use threadline_session::{RetryConfig, Retrying};
/// # fn wrap<S: threadline_types::CompletionService>(service: S) {
/// let patient = Retrying::new(service, RetryConfig::default().with_retry_count(3));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Retrying<S> {
    inner: S,
    scheduler: RetryScheduler,
}

impl<S> Retrying<S> {
    /// Wraps `inner` with retries under `config`.
    #[must_use]
    pub fn new(inner: S, config: RetryConfig) -> Self {
        Self { inner, scheduler: RetryScheduler::new(config) }
    }

    /// The wrapped service.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// The scheduler driving the retries.
    #[must_use]
    pub fn scheduler(&self) -> &RetryScheduler {
        &self.scheduler
    }
}

impl<S: CompletionService> CompletionService for Retrying<S> {
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, ProviderError>> + Send {
        async move { self.scheduler.run(|| self.inner.complete(request.clone())).await }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_rate_limit_policy() {
        let config = RetryConfig::default();
        assert_eq!(config.min_wait, Duration::from_secs(61));
        assert_eq!(config.max_wait, Duration::from_secs(240));
        assert_eq!(config.retry_count, 5);
        assert_eq!(config.retryable, vec![ProviderErrorKind::RateLimit]);
    }

    #[test]
    fn zero_retry_count_still_attempts_once() {
        assert_eq!(RetryConfig::default().with_retry_count(0).attempts(), 1);
    }

    #[test]
    fn backwards_wait_range_is_reordered() {
        let config = RetryConfig::default().with_wait(Duration::from_secs(9), Duration::from_secs(2));
        assert_eq!(config.min_wait, Duration::from_secs(2));
        assert_eq!(config.max_wait, Duration::from_secs(9));
    }

    #[test]
    fn permanent_errors_are_never_retried() {
        let config = RetryConfig::default()
            .with_retryable([ProviderErrorKind::Authentication, ProviderErrorKind::Timeout]);
        assert!(!config.retries(&ProviderError::Authentication("bad key".into())));
        assert!(config.retries(&ProviderError::Timeout(Duration::from_secs(5))));
        assert!(!config.retries(&ProviderError::RateLimit { retry_after: None }));
    }

    #[test]
    fn random_delay_stays_in_range() {
        let config = RetryConfig::default();
        let error = ProviderError::RateLimit { retry_after: None };
        for _ in 0..200 {
            let delay = config.delay_after(&error);
            assert!(delay >= config.min_wait && delay <= config.max_wait);
        }
    }

    #[test]
    fn retry_after_hint_is_clamped() {
        let config = RetryConfig::default();
        let short = ProviderError::RateLimit { retry_after: Some(Duration::from_secs(1)) };
        let long = ProviderError::RateLimit { retry_after: Some(Duration::from_secs(900)) };
        let fits = ProviderError::RateLimit { retry_after: Some(Duration::from_secs(100)) };
        assert_eq!(config.delay_after(&short), Duration::from_secs(61));
        assert_eq!(config.delay_after(&long), Duration::from_secs(240));
        assert_eq!(config.delay_after(&fits), Duration::from_secs(100));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: RetryConfig =
            serde_json::from_str(r#"{"retry_count": 2, "retryable": ["rate_limit", "timeout"]}"#)
                .unwrap();
        assert_eq!(config.retry_count, 2);
        assert_eq!(config.retryable, vec![ProviderErrorKind::RateLimit, ProviderErrorKind::Timeout]);
        assert_eq!(config.min_wait, Duration::from_secs(61));
    }
}
