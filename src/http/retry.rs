//! Rate-limit retry policy.
//!
//! Only HTTP 429 is retried by the transport. The policy decides how many
//! times and how long to wait between attempts.

use std::time::Duration;

use serde::Deserialize;

/// How the wait grows between consecutive retries.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Always wait the cooldown.
    #[default]
    Fixed,
    /// Double the cooldown after every retry.
    Exponential,
}

/// Bounded retry policy for rate-limited requests.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use battlemetrics::http::{Backoff, RetryPolicy};
///
/// let policy = RetryPolicy::default()
///     .with_max_retries(3)
///     .with_cooldown(Duration::from_secs(1))
///     .with_backoff(Backoff::Exponential);
///
/// assert_eq!(policy.delay(0, None), Duration::from_secs(1));
/// assert_eq!(policy.delay(2, None), Duration::from_secs(4));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Wait before the first retry.
    pub cooldown: Duration,
    pub backoff: Backoff,
    /// Upper bound for any single wait, `Retry-After` included.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 5,
            cooldown: Duration::from_secs(30),
            backoff: Backoff::Fixed,
            max_delay: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Wait before retry number `retry` (zero based).
    ///
    /// A `Retry-After` value sent by the server wins over the policy.
    pub fn delay(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let delay = retry_after.unwrap_or_else(|| match self.backoff {
            Backoff::Fixed => self.cooldown,
            Backoff::Exponential => self
                .cooldown
                .saturating_mul(2u32.saturating_pow(retry.min(31))),
        });

        delay.min(self.max_delay)
    }
}
