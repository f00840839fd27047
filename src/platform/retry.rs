//! Bounded exponential backoff for transient platform failures.
//!
//! The Platform Gateway itself never retries (§4.C) — retry policy belongs
//! to the caller. This is that policy, shared by every caller that posts to
//! the platform (the reconciler, the comment composer).

use std::time::Duration;

use super::error::PlatformError;

/// Maximum number of attempts (the initial call plus up to this many retries).
const MAX_ATTEMPTS: u32 = 4;

/// Base delay doubled on each retry: 200ms, 400ms, 800ms.
const BASE_DELAY: Duration = Duration::from_millis(200);

/// Run `op`, retrying with exponential backoff on `PlatformError::Transient`
/// up to `MAX_ATTEMPTS` total attempts. A `Client` error is surfaced
/// immediately without retry.
pub async fn with_retry<T, F, Fut>(mut op: F) -> Result<T, PlatformError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, PlatformError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                let delay = BASE_DELAY * 2u32.pow(attempt - 1);
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let calls = AtomicU32::new(0);
        let result = with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, PlatformError>(42) }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_retry(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(PlatformError::Transient {
                        status: Some(503),
                        message: "unavailable".to_string(),
                    })
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<i32, _> = with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(PlatformError::Client {
                    status: 422,
                    message: "bad".to_string(),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<i32, _> = with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(PlatformError::Transient {
                    status: Some(500),
                    message: "down".to_string(),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }
}
