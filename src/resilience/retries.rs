//! Retry policy for router admin calls.
//!
//! # Responsibilities
//! - Bound the number of attempts per (event, router)
//! - Compute the delay before each retry
//!
//! # Design Decisions
//! - Registration calls are idempotent, so every failure is retryable
//! - The attempt count, not a wall-clock deadline, bounds a retry loop
//! - Fixed interval by default; capped exponential backoff is opt-in

use std::time::Duration;

use crate::resilience::backoff::calculate_backoff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Schedule {
    Fixed,
    Exponential { max: Duration },
}

/// How often and how long to keep retrying one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    interval: Duration,
    max_attempts: u32,
    schedule: Schedule,
}

impl RetryPolicy {
    /// Retry every `interval`, for at most `max_attempts` calls in total.
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
            schedule: Schedule::Fixed,
        }
    }

    /// Start at `interval`, doubling up to `max`.
    pub fn exponential(interval: Duration, max: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
            schedule: Schedule::Exponential { max },
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the `failed`-th failed attempt, or `None` when exhausted.
    pub fn next_delay(&self, failed: u32) -> Option<Duration> {
        if failed >= self.max_attempts {
            return None;
        }
        Some(match self.schedule {
            Schedule::Fixed => self.interval,
            Schedule::Exponential { max } => calculate_backoff(failed, self.interval, max),
        })
    }
}
