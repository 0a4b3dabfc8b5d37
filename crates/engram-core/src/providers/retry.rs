//! Bounded retry with exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::{Error, Result};

/// Backoff floor and ceiling between attempts.
const MIN_BACKOFF: Duration = Duration::from_secs(2);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Run `operation` up to `attempts` times, sleeping between attempts with
/// exponential backoff and multiplicative jitter. The terminal error is
/// wrapped as [`Error::Upstream`] so callers see a post-retry failure.
pub(crate) async fn with_retries<T, F, Fut>(name: &str, attempts: u32, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error: Option<Error> = None;

    for attempt in 0..attempts.max(1) {
        if attempt > 0 {
            tokio::time::sleep(backoff(attempt)).await;
        }

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(
                    "{} attempt {}/{} failed: {}",
                    name,
                    attempt + 1,
                    attempts.max(1),
                    e
                );
                last_error = Some(e);
            }
        }
    }

    let detail = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no attempts made".to_string());
    Err(Error::Upstream(format!(
        "{} failed after {} attempts: {}",
        name,
        attempts.max(1),
        detail
    )))
}

fn backoff(attempt: u32) -> Duration {
    let base = Duration::from_secs(1 << attempt.min(4));
    let clamped = base.clamp(MIN_BACKOFF, MAX_BACKOFF);
    // jitter in [0.5, 1.5) spreads synchronized retries apart
    let jitter: f64 = rand::rng().random_range(0.5..1.5);
    clamped.mul_f64(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let calls = AtomicU32::new(0);
        let result = with_retries("op", 3, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Error>(42)
        })
        .await
        .unwrap();

        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_wraps_as_upstream() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retries("op", 3, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Internal("boom".to_string()))
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let err = result.unwrap_err();
        assert!(err.is_upstream());
        assert!(err.to_string().contains("after 3 attempts"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retries("op", 3, || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(Error::Internal("flaky".to_string()))
            } else {
                Ok("ok")
            }
        })
        .await
        .unwrap();

        assert_eq!(result, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_backoff_bounds() {
        for attempt in 1..6 {
            let delay = backoff(attempt);
            assert!(delay >= MIN_BACKOFF.mul_f64(0.5));
            assert!(delay <= MAX_BACKOFF.mul_f64(1.5));
        }
    }
}
