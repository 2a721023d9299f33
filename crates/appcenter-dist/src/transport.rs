//! Bounded retry for individual HTTP calls.
//!
//! Only transport-level failures are retried: errors where the HTTP exchange
//! could not be completed at all. A completed exchange with an error status
//! is a business failure and is handed back to the caller untouched; the
//! orchestration never re-runs a step because the service said no.

use std::thread;
use std::time::Duration;

use crate::error::ApiError;

const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(250);

/// Retry decorator around a single fallible call.
///
/// `max_retries` bounds the number of *additional* attempts, so a call runs
/// at most `max_retries + 1` times. Attempts back off exponentially starting
/// at the base delay.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }

    /// Overrides the backoff base delay. Tests run with `Duration::ZERO`.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Runs `call`, retrying transport errors until it completes or the
    /// bound is exhausted. `request` identifies the call in logs and errors.
    ///
    /// The closure is generic over its error type so tests can drive the
    /// policy without constructing a `reqwest::Error`.
    pub fn run<T, E, F>(&self, request: &str, mut call: F) -> Result<T, ApiError>
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
        F: FnMut() -> Result<T, E>,
    {
        let mut delay = self.base_delay;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match call() {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let source: Box<dyn std::error::Error + Send + Sync> = err.into();
                    if attempts > self.max_retries {
                        return Err(ApiError::Transport {
                            request: request.to_string(),
                            attempts,
                            source,
                        });
                    }
                    log::warn!(
                        "attempt {}/{} failed for {}: {}; retrying in {:?}",
                        attempts,
                        self.max_retries + 1,
                        request,
                        source,
                        delay
                    );
                    thread::sleep(delay);
                    delay = delay.saturating_mul(2);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries).with_base_delay(Duration::ZERO)
    }

    fn flaky(fail_times: u32) -> impl FnMut() -> Result<u32, io::Error> {
        let mut remaining = fail_times;
        move || {
            if remaining > 0 {
                remaining -= 1;
                Err(io::Error::other("connection reset"))
            } else {
                Ok(200)
            }
        }
    }

    #[test]
    fn succeeds_without_failures_on_first_attempt() {
        let calls = Cell::new(0u32);
        let result = policy(3).run("https://x/up", || {
            calls.set(calls.get() + 1);
            Ok::<_, io::Error>(200)
        });

        assert_eq!(result.unwrap(), 200);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn failing_n_times_then_succeeding_completes() {
        let result = policy(3).run("https://x/up", flaky(3));
        assert_eq!(result.unwrap(), 200);
    }

    #[test]
    fn failing_past_the_bound_surfaces_transport_error() {
        let result = policy(3).run("https://x/up", flaky(4));

        match result {
            Err(ApiError::Transport {
                request, attempts, ..
            }) => {
                assert_eq!(request, "https://x/up");
                assert_eq!(attempts, 4);
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn zero_retries_means_exactly_one_attempt() {
        let calls = Cell::new(0u32);
        let result = policy(0).run("https://x/up", || {
            calls.set(calls.get() + 1);
            Err::<u32, _>(io::Error::other("refused"))
        });

        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn completed_exchange_is_never_retried() {
        // A 500 response is a completed exchange: the closure returns Ok and
        // the policy must hand it back on the first attempt.
        let calls = Cell::new(0u32);
        let result = policy(5).run("https://x/up", || {
            calls.set(calls.get() + 1);
            Ok::<_, io::Error>(500)
        });

        assert_eq!(result.unwrap(), 500);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn exhaustion_propagates_the_last_error() {
        let mut attempt = 0;
        let result = policy(1).run("https://x/up", move || {
            attempt += 1;
            Err::<u32, _>(io::Error::other(format!("failure #{attempt}")))
        });

        match result {
            Err(ApiError::Transport { source, .. }) => {
                assert_eq!(source.to_string(), "failure #2");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
