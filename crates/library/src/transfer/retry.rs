use reel_remote::error::{ErrorKind as RemoteErrorKind, Result as RemoteResult};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::transfer::error::{ErrorKind, Result};

/// How long to wait before the next attempt.
pub trait Backoff: Send + Sync {
    /// `attempt` is the one-based number of the attempt that just failed.
    fn delay(&self, attempt: u32) -> Duration;
}

/// `base * 2^(attempt - 1)`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    pub base: Duration,
    pub max: Duration,
}
impl Backoff for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base.saturating_mul(factor).min(self.max)
    }
}

/// A fixed delay.
impl Backoff for Duration {
    fn delay(&self, _: u32) -> Duration {
        *self
    }
}

#[derive(Clone)]
pub struct RetryPolicy {
    /// Attempts per request, the first one included.
    pub max_attempts: u32,
    /// Bounded wait per request; running out counts as a temporary failure.
    pub timeout: Duration,
    pub backoff: Arc<dyn Backoff>,
}
impl RetryPolicy {
    pub fn new(max_attempts: u32, timeout: Duration, backoff: impl Backoff + 'static) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            timeout,
            backoff: Arc::new(backoff),
        }
    }
}
impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(4, Duration::from_secs(300), ExponentialBackoff {
            base: Duration::from_secs(2),
            max: Duration::from_secs(60),
        })
    }
}
impl Debug for RetryPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Runs `op` until it succeeds, fails for good, or runs out of attempts.
///
/// Returns the value together with the number of attempts it took. Waiting
/// between attempts stops early when `cancel` fires; a request that is
/// already in flight is never interrupted by it.
pub(crate) async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    what: &'static str,
    mut op: F,
) -> Result<(T, u32)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RemoteResult<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let e = match tokio::time::timeout(policy.timeout, op()).await {
            Ok(Ok(value)) => return Ok((value, attempt)),
            Ok(Err(e)) => e,
            Err(_) => exn::Exn::from(RemoteErrorKind::Timeout),
        };
        let give_up = match &*e {
            RemoteErrorKind::Auth => Some(ErrorKind::Auth(what)),
            RemoteErrorKind::QuotaExceeded => Some(ErrorKind::QuotaExceeded(what)),
            kind if kind.is_retryable() && attempt < policy.max_attempts => None,
            kind if kind.is_retryable() => Some(ErrorKind::Exhausted { what, attempts: attempt }),
            _ => Some(ErrorKind::Rejected(what)),
        };
        if let Some(kind) = give_up {
            tracing::warn!(what, attempt, error = %*e, "Giving up");
            return Err(e.raise(kind));
        }

        let delay = policy.backoff.delay(attempt);
        tracing::warn!(what, attempt, ?delay, error = %*e, "Temporary failure, retrying");
        tokio::select! {
            () = cancel.cancelled() => return Err(e.raise(ErrorKind::Cancelled)),
            () = tokio::time::sleep(delay) => {},
        }
    }
}
