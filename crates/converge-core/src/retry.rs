//! Bounded polling
//!
//! Both reconcilers wait for the API's eventual-consistency window with the
//! same loop: try, and if the state is not there yet, sleep a fixed interval
//! and try again, up to a fixed number of attempts. The total wait is always
//! `max_attempts × interval`; there is no open-ended retry anywhere.
//!
//! ```text
//! attempt 1 ── NotYet ── sleep ── attempt 2 ── NotYet ── sleep ── … ── attempt N ── Exhausted
//!     │                              │
//!     └─ Ready(v) / Err(e) ──────────┴──▶ returned immediately
//! ```
//!
//! Sleeping goes through [`Clock`] so tests can observe the schedule
//! without waiting.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::Result;

/// Source of sleeps for the polling loops
#[async_trait]
pub trait Clock: Send + Sync {
    /// Suspend the caller for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Attempts and spacing for one polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: usize,
    /// Sleep between two attempts
    pub interval: Duration,
}

impl RetryPolicy {
    /// Create a policy
    pub fn new(max_attempts: usize, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Upper bound on the time spent sleeping
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1) as u32
    }
}

/// Result of one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    /// The awaited state is visible
    Ready(T),
    /// Not visible yet; try again after the interval
    NotYet,
}

/// Result of a whole polling loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// An attempt succeeded
    Ready {
        /// Value produced by the successful attempt
        value: T,
        /// Attempts used, including the successful one
        attempts: usize,
    },
    /// Every attempt returned `NotYet`
    Exhausted {
        /// Attempts made
        attempts: usize,
    },
}

/// Fixed-interval polling driver
#[derive(Clone)]
pub struct RetryDriver {
    clock: Arc<dyn Clock>,
}

impl RetryDriver {
    /// Create a driver that sleeps through `clock`
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Create a driver backed by the tokio timer
    pub fn tokio() -> Self {
        Self::new(Arc::new(TokioClock))
    }

    /// Sleep once through the driver's clock
    pub async fn sleep(&self, duration: Duration) {
        self.clock.sleep(duration).await;
    }

    /// Run `attempt` until it is ready, errors, or the policy is exhausted
    ///
    /// An `Err` from an attempt stops the loop and is returned as is; only
    /// `Attempt::NotYet` is retried. No sleep follows the last attempt.
    pub async fn poll<T, F, Fut>(
        &self,
        policy: &RetryPolicy,
        mut attempt: F,
    ) -> Result<PollOutcome<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Attempt<T>>>,
    {
        for n in 1..=policy.max_attempts {
            match attempt().await? {
                Attempt::Ready(value) => {
                    return Ok(PollOutcome::Ready { value, attempts: n });
                }
                Attempt::NotYet => {
                    debug!("Attempt {}/{} not ready yet", n, policy.max_attempts);
                    if n < policy.max_attempts {
                        self.clock.sleep(policy.interval).await;
                    }
                }
            }
        }

        Ok(PollOutcome::Exhausted {
            attempts: policy.max_attempts,
        })
    }
}

impl Default for RetryDriver {
    fn default() -> Self {
        Self::tokio()
    }
}

impl std::fmt::Debug for RetryDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryDriver").finish_non_exhaustive()
    }
}
