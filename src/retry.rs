use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// Suspends the current task between retry attempts.
///
/// Injected into the dispatcher so tests can record the backoff schedule instead of
/// waiting for it.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by `tokio::time::sleep`; only the calling task is suspended.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub type DynSleeper = Arc<dyn Sleeper>;

/// Delay before the next attempt: `2^attempt` backoff units.
///
/// Attempts start at 1, so the first delay is two units.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use mistral_client::retry::backoff_delay;
///
/// let unit = Duration::from_secs(1);
/// assert_eq!(backoff_delay(1, unit), Duration::from_secs(2));
/// assert_eq!(backoff_delay(3, unit), Duration::from_secs(8));
/// ```
pub fn backoff_delay(attempt: u32, unit: Duration) -> Duration {
    let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
    unit.saturating_mul(factor)
}
