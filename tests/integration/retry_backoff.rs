//! Retry utility behavior against the pipeline error taxonomy.

use super::support::fast_retry;
use quill::concurrency::{retry_with_backoff, RetryError, RetryPolicy};
use quill::error::{ImageError, PipelineError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[tokio::test]
async fn test_fails_twice_then_succeeds_within_three_attempts() {
    let calls = AtomicU32::new(0);
    let result: Result<String, RetryError<PipelineError>> =
        retry_with_backoff(&fast_retry(3), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(PipelineError::content("empty reply"))
                } else {
                    Ok(format!("succeeded on attempt {}", attempt))
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), "succeeded on attempt 3");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_exhaustion_wraps_last_cause() {
    let result: Result<(), RetryError<ImageError>> =
        retry_with_backoff(&fast_retry(2), |attempt| async move {
            Err(ImageError::provider(format!("timeout #{}", attempt)))
        })
        .await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("gave up after 2 attempts"));
    assert_eq!(
        err.into_last().to_string(),
        "Image provider failed: timeout #2"
    );
}

#[tokio::test]
async fn test_terminal_content_error_is_not_retried() {
    let calls = AtomicU32::new(0);
    let result: Result<(), RetryError<PipelineError>> =
        retry_with_backoff(&fast_retry(5), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(PipelineError::content_terminal("seo extraction failed", None)) }
        })
        .await;

    assert!(matches!(result, Err(RetryError::NonRetryable(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_delays_follow_policy() {
    let policy = RetryPolicy {
        max_attempts: 4,
        initial_delay_ms: 100,
        multiplier: 2.0,
        max_delay_ms: 250,
    };
    let started = tokio::time::Instant::now();
    let result: Result<(), RetryError<PipelineError>> = retry_with_backoff(&policy, |_| async {
        Err(PipelineError::Provider("rate limited".to_string()))
    })
    .await;

    assert!(matches!(result, Err(RetryError::Exhausted { attempts: 4, .. })));
    // 100 + 200 + 250 (capped)
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(550), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(600), "elapsed {:?}", elapsed);
}
