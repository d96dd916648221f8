//! Retry with exponential backoff for transient store failures.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): base * 2^(attempt-1), capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }
}

/// Run `f` until it succeeds, fails with a non-transient error, or attempts run out.
///
/// ```ignore
/// let id = execute_with_retry(
///     || async { sqlx::query_scalar("SELECT 1").fetch_one(&pool).await.map_err(Into::into) },
///     RetryPolicy::default(),
/// ).await?;
/// ```
pub async fn execute_with_retry<F, Fut, T>(mut f: F, policy: RetryPolicy) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < policy.max_attempts && is_retriable_error(&e) => {
                let backoff = policy.backoff(attempt);
                warn!(
                    "Store operation failed (attempt {}/{}): {}. Retrying in {}ms",
                    attempt,
                    policy.max_attempts,
                    e,
                    backoff.as_millis()
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}

fn is_retriable_error(e: &anyhow::Error) -> bool {
    let err_str = format!("{:#}", e).to_lowercase();

    err_str.contains("connection")
        || err_str.contains("timeout")
        || err_str.contains("timed out")
        || err_str.contains("broken pipe")
        || err_str.contains("pool")
        // PostgreSQL transient errors
        || err_str.contains("could not serialize")
        || err_str.contains("deadlock detected")
        || err_str.contains("too many clients")
        || err_str.contains("server closed the connection")
}
