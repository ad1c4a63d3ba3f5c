//! Exponential backoff for transient upstream failures.
//!
//! The suspension point is behind the [`Sleeper`] trait so tests can assert
//! retry counts and delay progression without real wall-clock waits.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::warn;

use crate::error::Result;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Delay before the given retry attempt: `2^attempt` seconds plus up to one
/// second of jitter.
fn backoff_delay(attempt: u32) -> Duration {
    let base = 2u64.pow(attempt.min(6));
    let jitter: f64 = rand::random();
    Duration::from_secs_f64(base as f64 + jitter)
}

/// Run `op`, retrying transient failures per `policy`. Fatal errors are
/// returned immediately; exhausting the budget returns the last error so the
/// caller can apply its own partial-failure handling.
pub async fn with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    what: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    warn!("{} failed after {} attempts: {}", what, attempt, e);
                    return Err(e);
                }
                let delay = backoff_delay(attempt);
                warn!(
                    "{} failed (attempt {}/{}), retrying in {:.1}s: {}",
                    what,
                    attempt,
                    policy.max_attempts,
                    delay.as_secs_f64(),
                    e
                );
                sleeper.sleep(delay).await;
            }
        }
    }
}
