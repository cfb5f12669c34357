//! Retry policy for one request type.
//!
//! Validation uses `Validation` to accumulate every problem with a setting
//! instead of stopping at the first one, so a bad config file is fixed in a
//! single pass.

use serde::{Deserialize, Serialize};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// Marker for "retry forever" in [`RetrySetting::max_retry_attempts`].
pub const UNLIMITED_RETRIES: i32 = -1;

/// Shape of the delay between retries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Growth {
    /// Same delay every time
    #[default]
    Constant,
    /// `init_delay * (attempt + 1)`
    Linear,
    /// `init_delay * 2^attempt`
    Exponential,
}

/// Problems found in a [`RetrySetting`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingViolation {
    #[error("timeout_ns must be positive")]
    ZeroTimeout,

    #[error("max_retry_attempts must be -1 (unlimited) or non-negative, got {0}")]
    InvalidMaxRetryAttempts(i32),

    #[error("init_delay_ns must be positive when retries are enabled")]
    ZeroRetryDelay,

    #[error("max_delay_ns ({max_delay_ns}) is below init_delay_ns ({init_delay_ns})")]
    DelayCapBelowInitial { init_delay_ns: u64, max_delay_ns: u64 },
}

/// Timeout and retry policy shared by every request of one type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySetting {
    /// How long to wait for a response after each send
    pub timeout_ns: u64,
    /// Delay before the first retry
    pub init_delay_ns: u64,
    /// `-1` for unlimited
    pub max_retry_attempts: i32,
    #[serde(default)]
    pub growth: Growth,
    /// Upper bound on any computed delay
    #[serde(default = "RetrySetting::no_delay_cap")]
    pub max_delay_ns: u64,
}

impl RetrySetting {
    pub fn new(timeout_ns: u64, init_delay_ns: u64, max_retry_attempts: i32) -> Self {
        Self {
            timeout_ns,
            init_delay_ns,
            max_retry_attempts,
            growth: Growth::Constant,
            max_delay_ns: Self::no_delay_cap(),
        }
    }

    pub fn with_growth(mut self, growth: Growth) -> Self {
        self.growth = growth;
        self
    }

    pub fn with_max_delay_ns(mut self, max_delay_ns: u64) -> Self {
        self.max_delay_ns = max_delay_ns;
        self
    }

    fn no_delay_cap() -> u64 {
        u64::MAX
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_retry_attempts == UNLIMITED_RETRIES
    }

    /// Whether another attempt is allowed after `retries_so_far` retries.
    pub fn can_retry(&self, retries_so_far: u32) -> bool {
        self.is_unlimited() || i64::from(retries_so_far) < i64::from(self.max_retry_attempts)
    }

    /// Delay before retry number `attempt` (zero-based), capped at
    /// `max_delay_ns`. Saturates instead of overflowing.
    pub fn compute_delay_ns(&self, attempt: u32) -> u64 {
        let delay = match self.growth {
            Growth::Constant => self.init_delay_ns,
            Growth::Linear => self
                .init_delay_ns
                .saturating_mul(u64::from(attempt).saturating_add(1)),
            Growth::Exponential => self.init_delay_ns.saturating_mul(2u64.saturating_pow(attempt)),
        };
        delay.min(self.max_delay_ns)
    }

    /// Check every rule, accumulating all violations.
    pub fn validate(&self) -> Validation<(), NonEmptyVec<SettingViolation>> {
        let mut checks: Vec<Validation<(), NonEmptyVec<SettingViolation>>> = Vec::new();

        checks.push(if self.timeout_ns == 0 {
            Validation::fail(SettingViolation::ZeroTimeout)
        } else {
            Validation::success(())
        });

        checks.push(if self.max_retry_attempts < UNLIMITED_RETRIES {
            Validation::fail(SettingViolation::InvalidMaxRetryAttempts(
                self.max_retry_attempts,
            ))
        } else {
            Validation::success(())
        });

        checks.push(if self.max_retry_attempts != 0 && self.init_delay_ns == 0 {
            Validation::fail(SettingViolation::ZeroRetryDelay)
        } else {
            Validation::success(())
        });

        checks.push(if self.max_delay_ns < self.init_delay_ns {
            Validation::fail(SettingViolation::DelayCapBelowInitial {
                init_delay_ns: self.init_delay_ns,
                max_delay_ns: self.max_delay_ns,
            })
        } else {
            Validation::success(())
        });

        Validation::all_vec(checks).map(|_| ())
    }

    /// [`validate`](Self::validate) flattened into a plain list.
    pub fn violations(&self) -> Vec<SettingViolation> {
        match self.validate() {
            Validation::Success(()) => Vec::new(),
            Validation::Failure(errors) => errors.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: u64 = 1_000_000_000;

    #[test]
    fn constant_growth_repeats_initial_delay() {
        let setting = RetrySetting::new(5 * SECOND, SECOND, 3);
        assert_eq!(setting.compute_delay_ns(0), SECOND);
        assert_eq!(setting.compute_delay_ns(7), SECOND);
    }

    #[test]
    fn linear_and_exponential_growth_are_capped() {
        let linear = RetrySetting::new(SECOND, 100, 5).with_growth(Growth::Linear);
        assert_eq!(linear.compute_delay_ns(0), 100);
        assert_eq!(linear.compute_delay_ns(2), 300);

        let exponential = RetrySetting::new(SECOND, 100, 5)
            .with_growth(Growth::Exponential)
            .with_max_delay_ns(1_000);
        assert_eq!(exponential.compute_delay_ns(0), 100);
        assert_eq!(exponential.compute_delay_ns(3), 800);
        assert_eq!(exponential.compute_delay_ns(4), 1_000);
        assert_eq!(exponential.compute_delay_ns(200), 1_000);
    }

    #[test]
    fn can_retry_respects_limit() {
        let none = RetrySetting::new(SECOND, SECOND, 0);
        assert!(!none.can_retry(0));

        let once = RetrySetting::new(SECOND, SECOND, 1);
        assert!(once.can_retry(0));
        assert!(!once.can_retry(1));

        let unlimited = RetrySetting::new(SECOND, SECOND, UNLIMITED_RETRIES);
        assert!(unlimited.can_retry(u32::MAX));
    }

    #[test]
    fn validation_accumulates_all_violations() {
        let setting = RetrySetting::new(0, 0, -3).with_max_delay_ns(0);

        match setting.validate() {
            Validation::Failure(errors) => {
                assert_eq!(errors.len(), 3);
                assert!(errors
                    .iter()
                    .any(|e| matches!(e, SettingViolation::ZeroTimeout)));
                assert!(errors
                    .iter()
                    .any(|e| matches!(e, SettingViolation::InvalidMaxRetryAttempts(-3))));
                assert!(errors
                    .iter()
                    .any(|e| matches!(e, SettingViolation::ZeroRetryDelay)));
            }
            Validation::Success(_) => panic!("Expected failures, got success"),
        }
    }

    #[test]
    fn valid_setting_passes() {
        let setting = RetrySetting::new(5 * SECOND, SECOND, 1);
        assert!(matches!(setting.validate(), Validation::Success(())));
        assert!(setting.violations().is_empty());
    }

    #[test]
    fn setting_deserializes_with_defaults() {
        let setting: RetrySetting = serde_json::from_str(
            r#"{"timeout_ns": 5000, "init_delay_ns": 100, "max_retry_attempts": -1}"#,
        )
        .unwrap();

        assert!(setting.is_unlimited());
        assert_eq!(setting.growth, Growth::Constant);
        assert_eq!(setting.max_delay_ns, u64::MAX);
    }
}
