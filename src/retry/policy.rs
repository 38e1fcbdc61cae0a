//! Retry budget and backoff configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default number of attempts per request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default delay before the first retry, in milliseconds.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 500;

/// A retry policy could not be built from the given values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidConfiguration(pub String);

impl fmt::Display for InvalidConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid retry configuration: {}", self.0)
    }
}

impl std::error::Error for InvalidConfiguration {}

/// How many times to attempt a request and how long to wait in between.
///
/// The delay starts at `initial_delay` and doubles after every retry. It
/// grows without bound unless a `max_delay` cap is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PolicyConfig", into = "PolicyConfig")]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Option<Duration>,
}

impl RetryPolicy {
    /// Builds a policy. Delays have millisecond granularity.
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Result<Self, InvalidConfiguration> {
        if max_attempts == 0 {
            return Err(InvalidConfiguration(
                "Provide a retry count greater than zero".to_string(),
            ));
        }
        whole_millis(initial_delay, "delay")?;

        Ok(Self {
            max_attempts,
            initial_delay,
            max_delay: None,
        })
    }

    /// Caps every backoff delay at `max_delay`.
    pub fn with_max_delay(self, max_delay: Duration) -> Result<Self, InvalidConfiguration> {
        whole_millis(max_delay, "maximum delay")?;

        Ok(Self {
            max_delay: Some(max_delay),
            ..self
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    /// Delay slept before retry number `retry` (zero-based): the initial
    /// delay doubled `retry` times, clamped to the cap. Saturates instead of
    /// overflowing.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        let delay = self.initial_delay.saturating_mul(factor);
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }
}

/// Checks that `delay` is a positive whole number of milliseconds that fits in a `u64`.
fn whole_millis(delay: Duration, what: &str) -> Result<u64, InvalidConfiguration> {
    if delay.is_zero() {
        return Err(InvalidConfiguration(format!(
            "Provide a {} greater than zero",
            what
        )));
    }
    if delay.subsec_nanos() % 1_000_000 != 0 {
        return Err(InvalidConfiguration(format!(
            "Provide a {} in whole milliseconds, got {:?}",
            what, delay
        )));
    }
    u64::try_from(delay.as_millis())
        .map_err(|_| InvalidConfiguration(format!("The {} {:?} is too large", what, delay)))
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: None,
        }
    }
}

/// Serialized form of [`RetryPolicy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PolicyConfig {
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    initial_delay_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_delay_ms: Option<u64>,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_initial_delay_ms() -> u64 {
    DEFAULT_INITIAL_DELAY_MS
}

impl TryFrom<PolicyConfig> for RetryPolicy {
    type Error = InvalidConfiguration;

    fn try_from(config: PolicyConfig) -> Result<Self, Self::Error> {
        let policy = RetryPolicy::new(
            config.max_attempts,
            Duration::from_millis(config.initial_delay_ms),
        )?;
        match config.max_delay_ms {
            Some(ms) => policy.with_max_delay(Duration::from_millis(ms)),
            None => Ok(policy),
        }
    }
}

/// Delays in a built policy were checked by [`whole_millis`], so this is exact.
fn millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

impl From<RetryPolicy> for PolicyConfig {
    fn from(policy: RetryPolicy) -> Self {
        Self {
            max_attempts: policy.max_attempts,
            initial_delay_ms: millis(policy.initial_delay),
            max_delay_ms: policy.max_delay.map(millis),
        }
    }
}
