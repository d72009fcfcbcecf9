//! Retry scheduling under paused tokio time.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use threadline_session::{RetryConfig, RetryScheduler, Retrying};
use threadline_types::{
    CompletionRequest, CompletionResponse, CompletionService, Message, ProviderError,
    ProviderErrorKind, TokenUsage,
};
use tokio::time::Instant;

fn rate_limited() -> ProviderError {
    ProviderError::RateLimit { retry_after: None }
}

#[tokio::test(start_paused = true)]
async fn exhausts_after_retry_count_attempts() {
    let scheduler = RetryScheduler::new(RetryConfig::default());
    let calls = AtomicUsize::new(0);
    let start = Instant::now();

    let result: Result<(), _> = scheduler
        .run(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(rate_limited()) }
        })
        .await;

    let elapsed = start.elapsed();
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    match result {
        Err(ProviderError::RetryExhausted { attempts, last }) => {
            assert_eq!(attempts, 5);
            assert!(matches!(*last, ProviderError::RateLimit { .. }));
        }
        other => panic!("expected RetryExhausted, got {other:?}"),
    }
    // four waits between five attempts
    assert!(elapsed >= Duration::from_secs(4 * 61), "waited only {elapsed:?}");
    assert!(elapsed <= Duration::from_secs(5 * 240), "waited {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn non_retryable_error_fails_without_waiting() {
    let scheduler = RetryScheduler::new(RetryConfig::default());
    let calls = AtomicUsize::new(0);
    let start = Instant::now();

    let result: Result<(), _> = scheduler
        .run(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::Authentication("bad key".into())) }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(result, Err(ProviderError::Authentication(_))));
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn recovers_after_transient_failures() {
    let config = RetryConfig::default().with_wait(Duration::from_secs(1), Duration::from_secs(2));
    let scheduler = RetryScheduler::new(config);
    let calls = AtomicUsize::new(0);

    let result = scheduler
        .run(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { Err(rate_limited()) } else { Ok(n) } }
        })
        .await;

    assert_eq!(result.unwrap(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn only_configured_kinds_are_retried() {
    let config = RetryConfig::default()
        .with_wait(Duration::from_millis(10), Duration::from_millis(20))
        .with_retry_count(3)
        .with_retryable([ProviderErrorKind::Timeout]);
    let scheduler = RetryScheduler::new(config);

    let timeouts = AtomicUsize::new(0);
    let result: Result<(), _> = scheduler
        .run(|| {
            timeouts.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::Timeout(Duration::from_secs(30))) }
        })
        .await;
    assert_eq!(timeouts.load(Ordering::SeqCst), 3);
    assert!(matches!(result, Err(ProviderError::RetryExhausted { attempts: 3, .. })));

    // rate limits are no longer in the list
    let limits = AtomicUsize::new(0);
    let result: Result<(), _> = scheduler
        .run(|| {
            limits.fetch_add(1, Ordering::SeqCst);
            async { Err(rate_limited()) }
        })
        .await;
    assert_eq!(limits.load(Ordering::SeqCst), 1);
    assert!(matches!(result, Err(ProviderError::RateLimit { .. })));
}

#[tokio::test(start_paused = true)]
async fn zero_retry_count_makes_one_attempt() {
    let scheduler = RetryScheduler::new(RetryConfig::default().with_retry_count(0));
    let calls = AtomicUsize::new(0);
    let start = Instant::now();

    let result: Result<(), _> = scheduler
        .run(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(rate_limited()) }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(result, Err(ProviderError::RetryExhausted { attempts: 1, .. })));
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn retry_after_hint_sets_the_wait() {
    let config = RetryConfig::default().with_retry_count(2);
    let scheduler = RetryScheduler::new(config);
    let calls = AtomicUsize::new(0);
    let start = Instant::now();

    let _ = scheduler
        .run(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ProviderError::RateLimit { retry_after: Some(Duration::from_secs(90)) })
                } else {
                    Ok(())
                }
            }
        })
        .await;

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(90) && elapsed < Duration::from_secs(91), "{elapsed:?}");
}

// ---- Retrying adapter -------------------------------------------------------

/// Rate-limits the first `failures` calls, then answers.
struct Flaky {
    failures: usize,
    calls: Arc<AtomicUsize>,
}

impl CompletionService for Flaky {
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, ProviderError>> + Send {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let failures = self.failures;
        async move {
            if n < failures {
                return Err(rate_limited());
            }
            Ok(CompletionResponse {
                model: request.model,
                message: Message::assistant("finally"),
                usage: TokenUsage::default(),
            })
        }
    }
}

#[tokio::test(start_paused = true)]
async fn retrying_service_hides_transient_rate_limits() {
    let calls = Arc::new(AtomicUsize::new(0));
    let service = Retrying::new(Flaky { failures: 3, calls: Arc::clone(&calls) }, RetryConfig::default());

    let response = service
        .complete(CompletionRequest { model: "m".into(), ..Default::default() })
        .await
        .unwrap();

    assert_eq!(response.message.content, "finally");
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn retrying_service_gives_up() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::default().with_retry_count(2);
    let service = Retrying::new(Flaky { failures: 10, calls: Arc::clone(&calls) }, config);

    let err = service.complete(CompletionRequest::default()).await.unwrap_err();

    assert!(matches!(err, ProviderError::RetryExhausted { attempts: 2, .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
