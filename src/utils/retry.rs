use std::fmt;
use std::future::Future;
use tokio::time::{sleep, Duration};

/// Bounded exponential backoff for a single operation within one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
        }
    }
}

/// Calls `action` until it succeeds, `should_retry` rejects the error, or
/// `max_retries` extra attempts have been spent. The last error is returned.
pub async fn retry_with_backoff<A, F, T, E, P>(
    policy: &RetryPolicy,
    label: &str,
    mut should_retry: P,
    mut action: A,
) -> Result<T, E>
where
    A: FnMut() -> F,
    F: Future<Output = Result<T, E>>,
    E: fmt::Display,
    P: FnMut(&E) -> bool,
{
    let mut retries = 0;
    let mut delay = policy.initial_delay;

    loop {
        match action().await {
            Ok(val) => {
                if retries > 0 {
                    tracing::info!("[{}] succeeded after {} retries", label, retries);
                }
                return Ok(val);
            }
            Err(err) => {
                if !should_retry(&err) {
                    tracing::debug!("[{}] failed with non-retryable error: {}", label, err);
                    return Err(err);
                }
                if retries >= policy.max_retries {
                    tracing::error!("[{}] failed after {} retries: {}", label, retries, err);
                    return Err(err);
                }

                retries += 1;
                tracing::warn!(
                    "[{}] failed (attempt {}/{}), retrying in {:.2}s: {}",
                    label,
                    retries,
                    policy.max_retries,
                    delay.as_secs_f64(),
                    err
                );
                sleep(delay).await;
                delay = delay.mul_f64(policy.backoff_factor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{pause, Instant};

    #[tokio::test]
    async fn test_success_needs_no_delay() {
        pause();
        let start = Instant::now();

        let result: Result<u32, String> =
            retry_with_backoff(&RetryPolicy::default(), "test", |_| true, || async { Ok(7) }).await;

        assert_eq!(result, Ok(7));
        assert_eq!(start.elapsed().as_secs(), 0);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        pause();
        let start = Instant::now();
        let mut calls = 0;

        let result: Result<(), String> = retry_with_backoff(
            &RetryPolicy::default(),
            "test",
            |_| true,
            || {
                calls += 1;
                async { Err("unavailable".to_string()) }
            },
        )
        .await;

        assert_eq!(result, Err("unavailable".to_string()));
        assert_eq!(calls, 4);
        assert_eq!(start.elapsed().as_secs(), 1 + 2 + 4);
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        pause();
        let mut calls = 0;

        let result: Result<(), u16> = retry_with_backoff(
            &RetryPolicy::default(),
            "test",
            |status| *status == 503,
            || {
                calls += 1;
                async { Err(403) }
            },
        )
        .await;

        assert_eq!(result, Err(403));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        pause();
        let mut calls = 0;

        let result: Result<&str, u16> = retry_with_backoff(
            &RetryPolicy::default(),
            "test",
            |status| *status == 503,
            || {
                calls += 1;
                let attempt = calls;
                async move {
                    if attempt < 3 {
                        Err(503)
                    } else {
                        Ok("rows")
                    }
                }
            },
        )
        .await;

        assert_eq!(result, Ok("rows"));
        assert_eq!(calls, 3);
    }
}
