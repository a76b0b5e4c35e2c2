// src/retry.rs
//! Bounded retry/polling primitive used by delivery. Replaces open-ended
//! sleep loops with a fixed attempt budget and a definite outcome.

use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
    /// Doubles the interval after each failed attempt when set.
    pub exponential: bool,
}

impl RetryPolicy {
    pub const fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            exponential: false,
        }
    }

    pub const fn exponential(max_attempts: u32, base: Duration) -> Self {
        Self {
            max_attempts,
            interval: base,
            exponential: true,
        }
    }

    fn delay_after(&self, attempt: u32) -> Duration {
        if self.exponential {
            // attempt is 1-based; shift saturates well below overflow range
            self.interval * 2u32.saturating_pow(attempt.saturating_sub(1))
        } else {
            self.interval
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    Succeeded { attempts: u32 },
    TimedOut { attempts: u32 },
}

impl RetryOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, RetryOutcome::Succeeded { .. })
    }
}

/// Run `probe` until it reports success or the attempt budget is spent.
/// Sleeps between attempts, never after the last one.
pub async fn retry_until<F, Fut>(policy: &RetryPolicy, mut probe: F) -> RetryOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let max = policy.max_attempts.max(1);
    for attempt in 1..=max {
        if probe().await {
            return RetryOutcome::Succeeded { attempts: attempt };
        }
        if attempt < max {
            tokio::time::sleep(policy.delay_after(attempt)).await;
        }
    }
    RetryOutcome::TimedOut { attempts: max }
}
