//! Retry wrapper for gateway calls.

use qanun_core::{AppError, AppResult, GatewayStage};
use std::future::Future;
use std::time::Duration;

/// Runs a gateway call with a per-attempt timeout and a bounded number
/// of retries.
///
/// A timed-out attempt counts as `GatewayTimeout` for the given stage.
/// Only retryable errors (timeouts, malformed responses, transport
/// failures, 5xx statuses) trigger another attempt; anything else is
/// returned immediately.
pub async fn with_retry<T, F, Fut>(
    stage: GatewayStage,
    timeout: Duration,
    retries: u32,
    backoff: Duration,
    mut op: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let attempts = retries + 1;
    let mut last_error = None;

    for attempt in 1..=attempts {
        let result = match tokio::time::timeout(timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(AppError::GatewayTimeout { stage }),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retryable() && attempt < attempts => {
                tracing::warn!(
                    "{} call failed (attempt {}/{}), retrying in {}ms: {}",
                    stage,
                    attempt,
                    attempts,
                    backoff.as_millis(),
                    error
                );
                last_error = Some(error);
                tokio::time::sleep(backoff).await;
            }
            Err(error) => return Err(error),
        }
    }

    Err(last_error.unwrap_or(AppError::GatewayTimeout { stage }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn test_timeout() -> Duration {
        Duration::from_millis(200)
    }

    fn test_backoff() -> Duration {
        Duration::from_millis(1)
    }

    #[tokio::test]
    async fn returns_first_success_without_retrying() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = with_retry(GatewayStage::Embedding, test_timeout(), 1, test_backoff(), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(42usize)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_once_then_fails_on_retryable_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: AppResult<usize> =
            with_retry(GatewayStage::Rerank, test_timeout(), 1, test_backoff(), || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(AppError::GatewayTimeout {
                        stage: GatewayStage::Rerank,
                    })
                }
            })
            .await;

        assert!(matches!(
            result,
            Err(AppError::GatewayTimeout {
                stage: GatewayStage::Rerank
            })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn recovers_when_a_retry_succeeds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = with_retry(GatewayStage::Embedding, test_timeout(), 1, test_backoff(), || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(AppError::GatewayMalformed {
                        stage: GatewayStage::Embedding,
                        detail: "bad payload".to_string(),
                    })
                } else {
                    Ok("ok")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retryable_error_returns_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: AppResult<usize> =
            with_retry(GatewayStage::Generation, test_timeout(), 3, test_backoff(), || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(AppError::Gateway {
                        stage: GatewayStage::Generation,
                        status: Some(400),
                        detail: "bad request".to_string(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(AppError::Gateway { status: Some(400), .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_call_times_out_as_gateway_timeout() {
        let result: AppResult<usize> = with_retry(
            GatewayStage::Generation,
            Duration::from_millis(20),
            0,
            test_backoff(),
            || async {
                std::future::pending::<()>().await;
                Ok(0)
            },
        )
        .await;

        assert!(matches!(
            result,
            Err(AppError::GatewayTimeout {
                stage: GatewayStage::Generation
            })
        ));
    }
}
