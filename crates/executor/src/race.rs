//! Immediate attempt with one delayed fallback
//!
//! Data may still be replicating when the first attempt runs. The
//! controller runs the attempt immediately; if it fails with a retryable
//! error it waits [`RaceController::retry_delay`] and runs it exactly once
//! more. The fallback never starts before the primary has finished, and
//! whichever attempt finishes last decides the outcome.

use std::future::Future;
use std::time::Duration;

use roomq_core::Result;
use tracing::debug;

/// Delay before the fallback attempt.
pub const RETRY_DELAY: Duration = Duration::from_millis(200);

/// Which branch an attempt runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// The immediate attempt
    Primary,
    /// The single delayed retry
    Fallback,
}

/// Runs an attempt with one delayed retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceController {
    retry_delay: Duration,
}

impl Default for RaceController {
    fn default() -> Self {
        Self::new(RETRY_DELAY)
    }
}

impl RaceController {
    /// Controller with a custom fallback delay.
    pub fn new(retry_delay: Duration) -> Self {
        Self { retry_delay }
    }

    /// Delay before the fallback attempt.
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Run `attempt` as primary, then at most once more as fallback.
    ///
    /// Non-retryable errors from the primary are returned without a
    /// fallback. The fallback's error is returned as is.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T>
    where
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let failure = match attempt(Attempt::Primary).await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => e,
        };
        debug!(
            target: "roomq::race",
            error = %failure,
            delay_ms = self.retry_delay.as_millis() as u64,
            "Primary attempt failed, scheduling fallback"
        );

        tokio::time::sleep(self.retry_delay).await;
        let outcome = attempt(Attempt::Fallback).await;
        debug!(target: "roomq::race", ok = outcome.is_ok(), "Fallback attempt finished");
        outcome
    }
}
