// src/api/rate_limiter.rs
//! Rate limiting and retry for Notion API calls.
//!
//! The whole tool runs single-threaded and blocking, so rate limiting
//! is a minimum inter-call interval enforced by sleeping the calling
//! thread, and retry is a cooperative backoff loop around the request
//! closure.

use crate::constants::{MAX_API_RETRIES, RETRY_BACKOFF_FACTOR};
use crate::error::AppError;
use std::cell::Cell;
use std::time::{Duration, Instant};

/// Minimum-interval rate limiter (token-bucket with bucket size one).
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Cell<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(requests_per_second: f64) -> Self {
        Self {
            min_interval: Duration::from_secs_f64(1.0 / requests_per_second),
            last_request: Cell::new(None),
        }
    }

    /// Sleep until the minimum interval since the previous call has
    /// elapsed, then stamp the current call.
    pub fn wait(&self) {
        if let Some(last) = self.last_request.get() {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let pause = self.min_interval - elapsed;
                log::debug!("Rate limiting: sleeping {:.3}s", pause.as_secs_f64());
                std::thread::sleep(pause);
            }
        }
        self.last_request.set(Some(Instant::now()));
    }
}

/// Run `operation` with exponential backoff on retryable failures.
///
/// Retryable means a 429 or retryable 5xx from the API, or a
/// connect/timeout transport error. A Retry-After hint from a 429
/// response overrides the computed backoff when it is longer.
pub fn with_retry<T, F>(name: &str, operation: F) -> Result<T, AppError>
where
    F: FnMut() -> Result<T, AppError>,
{
    retry_loop(name, MAX_API_RETRIES, RETRY_BACKOFF_FACTOR, operation)
}

fn retry_loop<T, F>(
    name: &str,
    max_retries: u32,
    backoff_factor: f64,
    mut operation: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Result<T, AppError>,
{
    let mut attempt: u32 = 0;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_retries => {
                let mut sleep_secs = backoff_factor.powi(attempt as i32);
                if let Some(retry_after) = err.retry_after() {
                    sleep_secs = sleep_secs.max(retry_after);
                }
                attempt += 1;
                log::warn!(
                    "{} failed ({}), retrying in {:.1}s (attempt {}/{})",
                    name,
                    err,
                    sleep_secs,
                    attempt,
                    max_retries,
                );
                std::thread::sleep(Duration::from_secs_f64(sleep_secs));
            }
            Err(err) => {
                if err.is_retryable() {
                    log::error!("{} failed after {} retries: {}", name, max_retries, err);
                }
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotionErrorCode;

    fn service_error(code: NotionErrorCode, status: u16) -> AppError {
        AppError::NotionService {
            code,
            message: "boom".to_string(),
            status,
            retry_after: None,
        }
    }

    #[test]
    fn rate_limiter_enforces_min_interval() {
        let limiter = RateLimiter::new(100.0);
        let start = Instant::now();
        limiter.wait();
        limiter.wait();
        limiter.wait();
        // Two gaps of at least 10ms each.
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn retries_retryable_then_succeeds() {
        let mut calls = 0u32;
        let result = retry_loop("test", 3, 0.001, || {
            calls += 1;
            if calls < 3 {
                Err(service_error(NotionErrorCode::ServiceUnavailable, 503))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 3);
    }

    #[test]
    fn non_retryable_fails_immediately() {
        let mut calls = 0u32;
        let result: Result<(), _> = retry_loop("test", 3, 0.001, || {
            calls += 1;
            Err(service_error(NotionErrorCode::ObjectNotFound, 404))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let mut calls = 0u32;
        let result: Result<(), _> = retry_loop("test", 3, 0.001, || {
            calls += 1;
            Err(service_error(NotionErrorCode::InternalError, 500))
        });
        assert!(result.is_err());
        assert_eq!(calls, 4);
    }
}
