//! Retry policy for catalog requests.
//!
//! Exponential backoff without jitter: with the defaults a request is tried
//! five times, waiting 1 s, 2 s, 4 s and 8 s between attempts.

use std::time::Duration;

use backoff::{backoff::Backoff, ExponentialBackoff};

use ingest_types::RetrySettings;

/// Bounded exponential backoff applied per logical request.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
    /// Cap for any single delay
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            multiplier: settings.multiplier,
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// Policy with millisecond delays, for tests and local tooling.
    pub fn fast(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::from_millis(1),
            multiplier: 2.0,
            max_backoff: Duration::from_millis(10),
        }
    }

    /// Fresh state for one logical request.
    pub fn start(&self) -> RetryState {
        let backoff = ExponentialBackoff {
            current_interval: self.initial_backoff,
            initial_interval: self.initial_backoff,
            randomization_factor: 0.0,
            multiplier: self.multiplier,
            max_interval: self.max_backoff,
            max_elapsed_time: None,
            ..Default::default()
        };
        RetryState {
            attempt_count: 0,
            max_attempts: self.max_attempts,
            max_backoff: self.max_backoff,
            backoff,
        }
    }
}

/// Attempt counter and next delay for a single request.
pub struct RetryState {
    attempt_count: u32,
    max_attempts: u32,
    max_backoff: Duration,
    backoff: ExponentialBackoff,
}

impl RetryState {
    /// Attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempt_count
    }

    /// Mark the start of an attempt and return its 1-based number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempt_count += 1;
        self.attempt_count
    }

    /// Delay before the next attempt, or `None` once the attempt budget is spent.
    ///
    /// A server-provided `retry_after` replaces the computed delay, capped at
    /// the policy's maximum backoff.
    pub fn next_delay(&mut self, retry_after: Option<Duration>) -> Option<Duration> {
        if self.attempt_count >= self.max_attempts {
            return None;
        }
        let computed = self.backoff.next_backoff()?;
        Some(match retry_after {
            Some(hint) => hint.min(self.max_backoff),
            None => computed,
        })
    }
}
