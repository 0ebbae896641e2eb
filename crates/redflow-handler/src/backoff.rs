//! Backoff policies for re-invocation delays
//!
//! Delays are whole seconds because they are handed to an external scheduler.
//! Elapsed time is reconstructed from an attempt counter, so a policy needs no
//! clock and gives the same answer on every re-invocation.

use serde::{Deserialize, Serialize};

/// Delay schedule with an overall timeout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffPolicy {
    /// Same delay between every check
    Constant {
        delay_seconds: u64,
        timeout_seconds: u64,
    },
    /// Exponentially growing delay, capped at `max_delay_seconds`
    Exponential {
        initial_delay_seconds: u64,
        max_delay_seconds: u64,
        #[serde(default = "default_multiplier")]
        multiplier: f64,
        timeout_seconds: u64,
    },
}

fn default_multiplier() -> f64 {
    2.0
}

impl BackoffPolicy {
    pub const fn constant(delay_seconds: u64, timeout_seconds: u64) -> Self {
        Self::Constant {
            delay_seconds,
            timeout_seconds,
        }
    }

    pub const fn exponential(
        initial_delay_seconds: u64,
        max_delay_seconds: u64,
        timeout_seconds: u64,
    ) -> Self {
        Self::Exponential {
            initial_delay_seconds,
            max_delay_seconds,
            multiplier: 2.0,
            timeout_seconds,
        }
    }

    pub fn timeout_seconds(&self) -> u64 {
        match self {
            Self::Constant {
                timeout_seconds, ..
            }
            | Self::Exponential {
                timeout_seconds, ..
            } => *timeout_seconds,
        }
    }

    /// Raw delay for a zero-based attempt, never below one second
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let delay = match self {
            Self::Constant { delay_seconds, .. } => *delay_seconds,
            Self::Exponential {
                initial_delay_seconds,
                max_delay_seconds,
                multiplier,
                ..
            } => {
                let exponent = attempt.min(63) as i32;
                let delay = *initial_delay_seconds as f64 * multiplier.powi(exponent);
                delay.min(*max_delay_seconds as f64) as u64
            }
        };
        delay.max(1)
    }

    /// Seconds already waited after `attempts` suspensions
    pub fn elapsed_after(&self, attempts: u32) -> u64 {
        let timeout = self.timeout_seconds();
        (0..attempts).fold(0u64, |waited, attempt| {
            waited
                .saturating_add(self.delay_for_attempt(attempt))
                .min(timeout)
        })
    }

    /// Delay before the next check, or `None` once the timeout is spent
    ///
    /// The last delay is clipped so the sum of all delays never exceeds the
    /// timeout.
    pub fn next_delay(&self, attempts: u32) -> Option<u64> {
        let timeout = self.timeout_seconds();
        let waited = self.elapsed_after(attempts);
        if waited >= timeout {
            return None;
        }
        Some(self.delay_for_attempt(attempts).min(timeout - waited))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_schedule() {
        let policy = BackoffPolicy::constant(30, 100);

        assert_eq!(policy.next_delay(0), Some(30));
        assert_eq!(policy.next_delay(1), Some(30));
        assert_eq!(policy.next_delay(2), Some(30));
        // 90 seconds spent, only 10 left
        assert_eq!(policy.next_delay(3), Some(10));
        assert_eq!(policy.next_delay(4), None);
        assert_eq!(policy.elapsed_after(4), 100);
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let policy = BackoffPolicy::exponential(5, 60, 900);

        assert_eq!(policy.delay_for_attempt(0), 5);
        assert_eq!(policy.delay_for_attempt(1), 10);
        assert_eq!(policy.delay_for_attempt(2), 20);
        assert_eq!(policy.delay_for_attempt(3), 40);
        assert_eq!(policy.delay_for_attempt(4), 60); // capped at max
        assert_eq!(policy.delay_for_attempt(200), 60);
    }

    #[test]
    fn test_exponential_times_out() {
        let policy = BackoffPolicy::exponential(5, 60, 100);

        // 5 + 10 + 20 + 40 = 75, then 25 remaining
        assert_eq!(policy.next_delay(4), Some(25));
        assert_eq!(policy.next_delay(5), None);
    }

    #[test]
    fn test_zero_delay_still_makes_progress() {
        let policy = BackoffPolicy::constant(0, 3);

        assert_eq!(policy.next_delay(0), Some(1));
        assert_eq!(policy.next_delay(3), None);
    }

    #[test]
    fn test_deserialize_tagged() {
        let policy: BackoffPolicy = serde_json::from_str(
            r#"{"kind":"exponential","initial_delay_seconds":2,"max_delay_seconds":8,"timeout_seconds":60}"#,
        )
        .unwrap();

        assert_eq!(policy, BackoffPolicy::exponential(2, 8, 60));
    }
}
