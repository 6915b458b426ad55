use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::fetch::FetchError;

/// Exponential backoff for transient fetch failures.
///
/// The wait before retry `n` (1-based) is `multiplier * 2^(n-1)` seconds,
/// clamped to `[min_wait, max_wait]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub multiplier: f64,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier: 1.0,
            min_wait: Duration::from_secs(4),
            max_wait: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = 2f64.powi(attempt.saturating_sub(1).min(30) as i32);
        let secs = (self.multiplier * exp).max(0.0);
        Duration::from_secs_f64(secs).clamp(self.min_wait, self.max_wait)
    }
}

/// Run `op` until it succeeds, fails permanently, or runs out of attempts.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut op: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let wait = policy.backoff(attempt);
                warn!(
                    "Transient failure, retrying - target={}, attempt={}/{}, wait={:.1}s, error={}",
                    what,
                    attempt,
                    max_attempts,
                    wait.as_secs_f32(),
                    e
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
