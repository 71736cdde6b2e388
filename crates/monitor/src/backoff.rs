use std::time::Duration;

use config::Settings;
use tokio_retry::strategy::ExponentialBackoff;

/// Provider health derived from its consecutive failure count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    /// Last cycle succeeded; polling at the configured interval.
    Healthy,
    /// Failing, retrying with exponential backoff.
    BackingOff,
    /// Failed more than `max_retries` times in a row; retrying at the cap.
    Exhausted,
}

/// Jittered exponential backoff bounded by a cap.
///
/// The n-th consecutive failure waits `base * 2^(n-1)` plus a jitter of up to
/// half that amount, never more than `cap`. Once failures exceed
/// `max_retries` the provider is exhausted and waits exactly `cap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Wait after the first failure
    pub base: Duration,
    /// Upper bound of every wait
    pub cap: Duration,
    /// Failures tolerated before the provider is exhausted
    pub max_retries: u32,
}

impl BackoffPolicy {
    /// Build the policy from global settings.
    pub const fn from_settings(settings: &Settings) -> Self {
        Self {
            base: settings.base_backoff,
            cap: settings.max_backoff,
            max_retries: settings.max_retries,
        }
    }

    /// Health after `failures` consecutive failures.
    pub const fn health(&self, failures: u32) -> Health {
        if failures == 0 {
            Health::Healthy
        } else if failures > self.max_retries {
            Health::Exhausted
        } else {
            Health::BackingOff
        }
    }

    /// Exponential term without jitter, capped.
    pub fn exponential(&self, failures: u32) -> Duration {
        // the strategy yields base * 2^n starting at n = 1, so double the cap and halve
        let base_ms = u64::try_from(self.base.as_millis()).unwrap_or(u64::MAX);
        let steps = failures.saturating_sub(1).min(63) as usize;
        ExponentialBackoff::from_millis(2)
            .factor(base_ms)
            .max_delay(self.cap.saturating_mul(2))
            .nth(steps)
            .map_or(self.cap, |d| (d / 2).min(self.cap))
    }

    /// Wait before the next attempt after `failures` consecutive failures.
    ///
    /// `jitter` receives the maximum jitter and returns the amount to add.
    pub fn delay(&self, failures: u32, jitter: impl FnOnce(Duration) -> Duration) -> Duration {
        match self.health(failures) {
            Health::Healthy => Duration::ZERO,
            Health::Exhausted => self.cap,
            Health::BackingOff => {
                let exp = self.exponential(failures);
                exp.saturating_add(jitter(exp / 2).min(exp / 2)).min(self.cap)
            }
        }
    }

    /// Wait before the next cycle: the poll interval while healthy, backoff otherwise.
    pub fn next_wait(
        &self,
        failures: u32,
        poll_interval: Duration,
        jitter: impl FnOnce(Duration) -> Duration,
    ) -> Duration {
        if failures == 0 { poll_interval } else { self.delay(failures, jitter) }
    }
}
