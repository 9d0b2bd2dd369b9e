//! Deadlines and bounded retries for engine calls.

use crate::error::VoiceError;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

fn default_max_attempts() -> u32 {
    2
}

fn default_initial_backoff_ms() -> u64 {
    250
}

fn default_max_backoff_ms() -> u64 {
    2_000
}

/// Runs `future`, failing with [`VoiceError::Timeout`] if it does not finish
/// within `after`.
pub async fn deadline<T, F>(operation: &'static str, after: Duration, future: F) -> Result<T, VoiceError>
where
    F: Future<Output = Result<T, VoiceError>>,
{
    tokio::time::timeout(after, future)
        .await
        .map_err(|_| VoiceError::Timeout { operation, after })?
}

/// Bounded retry with exponential backoff.
///
/// `max_attempts` counts the first call, so `1` disables retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Calls `attempt` until it succeeds, fails permanently, or the attempt
    /// budget is spent. Only errors for which
    /// [`VoiceError::is_retryable`] holds are retried.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T, VoiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, VoiceError>>,
    {
        let attempts = self.max_attempts.max(1);
        let max_backoff = Duration::from_millis(self.max_backoff_ms);
        let mut backoff = Duration::from_millis(self.initial_backoff_ms).min(max_backoff);
        let mut made = 1;

        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) if made < attempts && e.is_retryable() => {
                    tracing::warn!(
                        operation,
                        attempt = made,
                        max_attempts = attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        "engine call failed, retrying: {}",
                        e
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(max_backoff);
                    made += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
