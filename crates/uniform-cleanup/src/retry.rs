//! Exponential-backoff retry for flaky remote calls.
//!
//! Wraps any asynchronous operation and retries it while the error's
//! remote code is in the retryable set and the attempt budget lasts.
//! The delay is `min(5s, rand * 2^(1 + attempt mod 3) * 100ms)`: capped
//! and cycling rather than unbounded. After the budget is spent the
//! last error is returned verbatim.

use crate::error::{CleanupError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

const RETRY_DELAY_BASE_MS: f64 = 100.0;
const MAX_DELAY_MS: f64 = 5000.0;
const MAX_RETRIES: u32 = 5;

pub const THROTTLING_ERROR: &str = "ThrottlingException";

pub async fn with_backoff<T, F, Fut>(
    max_retries: u32,
    error_codes: &[&str],
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                let retryable = error
                    .code()
                    .is_some_and(|code| error_codes.contains(&code));
                if !retryable || retries >= max_retries {
                    return Err(error);
                }
                warn!(code = error.code(), "retryable error encountered, retrying");
                let exponent = 1 + (retries % 3);
                let delay_ms = (rand::random::<f64>() * f64::from(1u32 << exponent)
                    * RETRY_DELAY_BASE_MS)
                    .min(MAX_DELAY_MS);
                tokio::time::sleep(Duration::from_millis(delay_ms as u64)).await;
                retries += 1;
            }
        }
    }
}

/// The standard preset: up to five retries on throttling.
pub async fn with_throttling_retry<T, F, Fut>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_backoff(MAX_RETRIES, &[THROTTLING_ERROR], operation).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
