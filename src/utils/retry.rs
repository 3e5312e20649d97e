// Retry with exponential backoff, gated on an error predicate.
//
// Only errors the predicate accepts are retried; everything else (and the
// final exhausted attempt) propagates unchanged. Used for the opt-in
// capacity retry on background sends.

use crate::types::{AppError, AppResult};
use futures::future::BoxFuture;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

pub async fn with_retry<'a, T, F, P>(
    mut operation: F,
    max_attempts: u32,
    should_retry: P,
) -> AppResult<T>
where
    F: FnMut() -> BoxFuture<'a, AppResult<T>>,
    P: Fn(&AppError) -> bool,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                attempt += 1;
                if attempt >= max_attempts || !should_retry(&error) {
                    return Err(error);
                }

                let delay = Duration::from_secs(2u64.pow(attempt.min(5)));
                info!(
                    attempt,
                    delay_secs = delay.as_secs(),
                    "Retrying after: {}",
                    error
                );
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn is_capacity(err: &AppError) -> bool {
        matches!(err, AppError::Capacity(_))
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_error_is_retried() {
        let calls = AtomicUsize::new(0);
        let result = with_retry(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(AppError::Capacity("All servers are busy".to_string()))
                    } else {
                        Ok(42)
                    }
                }
                .boxed()
            },
            3,
            is_capacity,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_error_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: AppResult<u32> = with_retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::Validation("invalid sender email".to_string())) }.boxed()
            },
            3,
            is_capacity,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicUsize::new(0);
        let result: AppResult<u32> = with_retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::Capacity("still busy".to_string())) }.boxed()
            },
            3,
            is_capacity,
        )
        .await;

        assert!(matches!(result.unwrap_err(), AppError::Capacity(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
