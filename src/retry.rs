//! Retry policies and the executor that drives them.
//!
//! A [`RetryPolicy`] looks at a failed attempt and decides whether, and after
//! how long, to try again. [`execute`] runs a producer under a policy and is
//! the only place in the crate where attempts are repeated.

use crate::{rate_limit, Error, Result};
use http::StatusCode;
use rand::Rng;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Decides whether a failed attempt should be retried.
///
/// # Examples
///
/// ```
/// use restline::{Error, RetryPolicy};
/// use std::time::Duration;
///
/// /// Retries throttled calls once, after a second.
/// #[derive(Debug)]
/// struct RetryThrottledOnce;
///
/// impl RetryPolicy for RetryThrottledOnce {
///     fn next_delay(&self, error: &Error, attempt: usize) -> Option<Duration> {
///         let throttled = error.status().map_or(false, |s| s.as_u16() == 429);
///         (throttled && attempt == 1).then(|| Duration::from_secs(1))
///     }
/// }
/// ```
pub trait RetryPolicy: Send + Sync + fmt::Debug {
    /// Returns the delay before the next attempt, or `None` to give up and
    /// surface `error` to the caller.
    ///
    /// `attempt` is the 1-indexed number of the attempt that just failed.
    fn next_delay(&self, error: &Error, attempt: usize) -> Option<Duration>;
}

/// Runs every call exactly once.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn next_delay(&self, _error: &Error, _attempt: usize) -> Option<Duration> {
        None
    }
}

/// How long to wait between attempts.
///
/// # Examples
///
/// ```
/// use restline::retry::Backoff;
/// use std::time::Duration;
///
/// // 100ms, 200ms, 400ms, 800ms... capped at 5s
/// let exponential = Backoff::Exponential {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(5),
///     jitter: false,
/// };
/// assert_eq!(exponential.delay_for_attempt(3), Duration::from_millis(400));
///
/// // 1s, 2s, 3s...
/// let linear = Backoff::Linear { step: Duration::from_secs(1) };
/// assert_eq!(linear.delay_for_attempt(3), Duration::from_secs(3));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Attempt `n` waits `n * step`.
    Linear {
        /// The delay added per attempt.
        step: Duration,
    },

    /// Attempt `n` waits `initial_delay * 2^(n - 1)`, capped at `max_delay`.
    /// Optional jitter scales each delay by a random factor in `[0.5, 1.0]`.
    Exponential {
        /// The delay before the first retry.
        initial_delay: Duration,
        /// The maximum delay between retries.
        max_delay: Duration,
        /// Whether to add random jitter to delays.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Exponential {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Returns the delay after the given failed attempt (1-indexed).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        match self {
            Backoff::Linear { step } => {
                step.saturating_mul(attempt.try_into().unwrap_or(u32::MAX))
            }
            Backoff::Exponential {
                initial_delay,
                max_delay,
                jitter,
            } => {
                let exponent = attempt.saturating_sub(1).min(31) as u32;
                let multiplier = 2u32.saturating_pow(exponent);
                let delay = initial_delay.saturating_mul(multiplier).min(*max_delay);

                if *jitter {
                    let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
                    delay.mul_f64(jitter_factor)
                } else {
                    delay
                }
            }
        }
    }
}

/// Retries transient failures a bounded number of times.
///
/// Transport failures, timeouts and responses with status 500, 502, 503, 504
/// or 429 are retried (see [`Error::is_retryable`]). When a 429 or 503
/// response carries `Retry-After`, that delay is used instead of the backoff,
/// capped at `max_wait`.
///
/// # Examples
///
/// ```
/// use restline::retry::{Backoff, DefaultRetry};
/// use std::time::Duration;
///
/// let policy = DefaultRetry::new(5).with_backoff(Backoff::Linear {
///     step: Duration::from_millis(250),
/// });
/// assert_eq!(policy.max_retries(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct DefaultRetry {
    max_retries: usize,
    backoff: Backoff,
    respect_retry_after: bool,
    max_wait: Duration,
}

impl DefaultRetry {
    /// Creates a policy that retries up to `max_retries` times after the first
    /// attempt, with exponential backoff and jitter.
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            backoff: Backoff::default(),
            respect_retry_after: true,
            max_wait: Duration::from_secs(300),
        }
    }

    /// Sets the backoff between attempts.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets whether `Retry-After` on 429/503 responses overrides the backoff.
    pub fn respect_retry_after(mut self, respect: bool) -> Self {
        self.respect_retry_after = respect;
        self
    }

    /// Caps delays requested through `Retry-After`.
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// The number of retries after the first attempt.
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    fn server_requested_delay(&self, error: &Error) -> Option<Duration> {
        if !self.respect_retry_after {
            return None;
        }
        let response = error.response()?;
        if response.status != StatusCode::TOO_MANY_REQUESTS
            && response.status != StatusCode::SERVICE_UNAVAILABLE
        {
            return None;
        }
        rate_limit::retry_after(&response.headers).map(|delay| delay.min(self.max_wait))
    }
}

impl Default for DefaultRetry {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RetryPolicy for DefaultRetry {
    fn next_delay(&self, error: &Error, attempt: usize) -> Option<Duration> {
        if attempt > self.max_retries || !error.is_retryable() {
            return None;
        }
        Some(
            self.server_requested_delay(error)
                .unwrap_or_else(|| self.backoff.delay_for_attempt(attempt)),
        )
    }
}

/// Runs `producer` under `policy` until it succeeds, the policy gives up, or
/// the call is cancelled.
///
/// The producer receives the 1-indexed attempt number. The final error is
/// returned unchanged when the policy gives up. Cancellation is checked before
/// each attempt and raced against each attempt and each backoff sleep; it
/// yields [`Error::Cancelled`].
pub async fn execute<T, F, Fut>(
    policy: &dyn RetryPolicy,
    cancellation: Option<&CancellationToken>,
    mut producer: F,
) -> Result<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        if cancellation.map_or(false, CancellationToken::is_cancelled) {
            return Err(Error::Cancelled);
        }

        let error = match cancellable(cancellation, producer(attempt)).await {
            Ok(value) => return Ok(value),
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => e,
        };

        let Some(delay) = policy.next_delay(&error, attempt) else {
            return Err(error);
        };

        tracing::warn!(
            error = %error,
            attempt = attempt,
            delay_ms = delay.as_millis(),
            "Attempt failed, retrying after delay"
        );

        cancellable(cancellation, async {
            tokio::time::sleep(delay).await;
            Ok(())
        })
        .await?;
    }
}

async fn cancellable<T, Fut>(cancellation: Option<&CancellationToken>, future: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match cancellation {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(Error::Cancelled),
                result = future => result,
            }
        }
        None => future.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::RawResponse;
    use http::HeaderValue;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn status_error(status: u16) -> Error {
        Error::Request {
            response: Box::new(RawResponse::new(StatusCode::from_u16(status).unwrap())),
            source: None,
        }
    }

    fn fast_retry(max_retries: usize) -> DefaultRetry {
        DefaultRetry::new(max_retries).with_backoff(Backoff::Linear {
            step: Duration::from_millis(1),
        })
    }

    #[test]
    fn test_exponential_backoff_delays() {
        let backoff = Backoff::Exponential {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            jitter: false,
        };

        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(backoff.delay_for_attempt(4), Duration::from_millis(800));
        assert_eq!(backoff.delay_for_attempt(8), Duration::from_secs(10));
        assert_eq!(backoff.delay_for_attempt(500), Duration::from_secs(10));
    }

    #[test]
    fn test_exponential_jitter_stays_in_range() {
        let backoff = Backoff::Exponential {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            jitter: true,
        };

        for _ in 0..50 {
            let delay = backoff.delay_for_attempt(2);
            assert!(delay >= Duration::from_millis(100) && delay <= Duration::from_millis(200));
        }
    }

    #[test]
    fn test_linear_delays() {
        let backoff = Backoff::Linear {
            step: Duration::from_secs(1),
        };

        assert_eq!(backoff.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(backoff.delay_for_attempt(3), Duration::from_secs(3));
    }

    #[test]
    fn test_no_retry() {
        assert_eq!(NoRetry.next_delay(&status_error(503), 1), None);
        assert_eq!(NoRetry.next_delay(&Error::Timeout, 1), None);
    }

    #[test]
    fn test_default_retry_classification() {
        let policy = fast_retry(3);

        for status in [500, 502, 503, 504, 429] {
            assert!(policy.next_delay(&status_error(status), 1).is_some());
        }
        assert!(policy.next_delay(&status_error(400), 1).is_none());
        assert!(policy.next_delay(&status_error(404), 1).is_none());
        assert!(policy.next_delay(&Error::Timeout, 1).is_some());
        assert!(policy.next_delay(&Error::Cancelled, 1).is_none());
    }

    #[test]
    fn test_default_retry_is_bounded() {
        let policy = fast_retry(2);
        assert!(policy.next_delay(&status_error(500), 2).is_some());
        assert!(policy.next_delay(&status_error(500), 3).is_none());
    }

    #[test]
    fn test_retry_after_overrides_backoff() {
        let mut response = RawResponse::new(StatusCode::TOO_MANY_REQUESTS);
        response
            .headers
            .insert("retry-after", HeaderValue::from_static("7"));
        let error = Error::Request {
            response: Box::new(response),
            source: None,
        };

        let policy = fast_retry(3);
        assert_eq!(policy.next_delay(&error, 1), Some(Duration::from_secs(7)));

        let capped = fast_retry(3).max_wait(Duration::from_secs(2));
        assert_eq!(capped.next_delay(&error, 1), Some(Duration::from_secs(2)));

        let ignoring = fast_retry(3).respect_retry_after(false);
        assert_eq!(ignoring.next_delay(&error, 1), Some(Duration::from_millis(1)));
    }

    #[tokio::test]
    async fn test_execute_retries_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = fast_retry(3);

        let result = execute(&policy, None, |attempt| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if attempt < 3 {
                    Err(status_error(503))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_execute_surfaces_last_error_unchanged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = fast_retry(2);

        let result: Result<()> = execute(&policy, None, |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(status_error(504))
            }
        })
        .await;

        assert_eq!(result.unwrap_err().status(), Some(StatusCode::GATEWAY_TIMEOUT));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_execute_does_not_retry_client_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = fast_retry(5);

        let result: Result<()> = execute(&policy, None, |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(status_error(400))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_retry_loop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        let policy = DefaultRetry::new(10).with_backoff(Backoff::Linear {
            step: Duration::from_secs(60),
        });

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result: Result<()> = execute(&policy, Some(&token), |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(status_error(500))
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let token = CancellationToken::new();
        token.cancel();

        let result: Result<()> =
            execute(&NoRetry, Some(&token), |_| async { Err(Error::Timeout) }).await;

        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
