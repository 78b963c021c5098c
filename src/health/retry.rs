// ABOUTME: Bounded retry policy decoupled from the operation it retries.
// ABOUTME: Sleeps go through a Clock so tests can run without real time passing.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::config::VerificationConfig;

/// Source of delays between attempts.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real time, via tokio.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Fixed-interval retry: at most `max_attempts` tries, `interval` between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    interval: Duration,
}

/// Result of running an operation under a [`RetryPolicy`].
#[derive(Debug)]
pub struct RetryOutcome<T> {
    /// Value from the final attempt made.
    pub last: T,
    pub attempts: u32,
    pub succeeded: bool,
}

impl RetryPolicy {
    /// A policy with at least one attempt.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `op` until `is_success` accepts its value or attempts run out.
    ///
    /// `op` receives the 1-based attempt number. There is no sleep after the
    /// last attempt.
    pub async fn run<T, F, Fut, P>(&self, clock: &dyn Clock, mut op: F, is_success: P) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = T>,
        P: Fn(&T) -> bool,
    {
        let mut attempt = 1;
        let mut last = op(attempt).await;

        loop {
            if is_success(&last) {
                return RetryOutcome {
                    last,
                    attempts: attempt,
                    succeeded: true,
                };
            }
            if attempt >= self.max_attempts {
                return RetryOutcome {
                    last,
                    attempts: attempt,
                    succeeded: false,
                };
            }
            clock.sleep(self.interval).await;
            attempt += 1;
            last = op(attempt).await;
        }
    }
}

impl From<&VerificationConfig> for RetryPolicy {
    fn from(config: &VerificationConfig) -> Self {
        RetryPolicy::new(config.max_attempts, config.interval)
    }
}
