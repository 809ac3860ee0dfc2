//! Retry policy with exponential backoff.
//!
//! The policy is a pure function of the attempt number. It never sleeps and
//! never inspects errors; the stage runner owns the retry loop.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ConfigurationError;

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry, in seconds.
    pub base_delay_s: f64,
    /// Multiplier applied per further retry.
    pub backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_s: 0.05,
            backoff: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that gives up after the first failure.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::default().with_max_attempts(1)
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay in seconds.
    #[must_use]
    pub fn with_base_delay_s(mut self, delay: f64) -> Self {
        self.base_delay_s = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff(mut self, backoff: f64) -> Self {
        self.backoff = backoff;
        self
    }

    /// Delay in seconds before retry number `attempt` (1-based):
    /// `base_delay_s * backoff^(attempt - 1)`.
    #[must_use]
    pub fn delay_seconds(&self, attempt: u32) -> f64 {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        self.base_delay_s * self.backoff.powi(exponent)
    }

    /// [`delay_seconds`](Self::delay_seconds) as a [`Duration`], saturating on overflow.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        Duration::try_from_secs_f64(self.delay_seconds(attempt).max(0.0)).unwrap_or(Duration::MAX)
    }

    /// Returns true if another attempt is allowed after `attempts` failures.
    #[must_use]
    pub fn allows_retry_after(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Validates the policy.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_attempts` is zero, the base delay is negative
    /// or not finite, or the backoff is not a positive finite number.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_attempts == 0 {
            return Err(ConfigurationError::new("retry.max_attempts must be at least 1"));
        }
        if !self.base_delay_s.is_finite() || self.base_delay_s < 0.0 {
            return Err(ConfigurationError::new(format!(
                "retry.base_delay_s must be a non-negative number, got {}",
                self.base_delay_s
            )));
        }
        if !self.backoff.is_finite() || self.backoff <= 0.0 {
            return Err(ConfigurationError::new(format!(
                "retry.backoff must be positive, got {}",
                self.backoff
            )));
        }
        Ok(())
    }
}
