use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Exponential backoff applied to unprocessed batch-write items
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Maximum number of resubmissions (0 means unlimited retries)
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Backoff base (unit: milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum backoff time (unit: milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl BackoffPolicy {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.base_delay_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "retry.unprocessed.base_delay_ms must be greater than 0".into(),
            )));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "retry.unprocessed.max_delay_ms ({}) must not be below base_delay_ms ({})",
                self.max_delay_ms, self.base_delay_ms
            ))));
        }
        Ok(())
    }
}

/// Polling used while waiting for a table to appear or disappear
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct WaiterPolicy {
    /// Fixed interval between two describe calls (unit: milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Polls before the wait is reported as failed
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for WaiterPolicy {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl WaiterPolicy {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "retry.waiter.poll_interval_ms must be greater than 0".into(),
            )));
        }
        if self.max_attempts == 0 {
            return Err(Error::Config(ConfigError::Message(
                "retry.waiter.max_attempts must be greater than 0".into(),
            )));
        }
        Ok(())
    }
}

/// Divide strategies by operation kind
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RetryPolicies {
    /// Resubmission of unprocessed delete requests
    #[serde(default)]
    pub unprocessed: BackoffPolicy,

    /// Table existence polling during recreate
    #[serde(default)]
    pub waiter: WaiterPolicy,
}

impl RetryPolicies {
    pub(crate) fn validate(&self) -> Result<()> {
        self.unprocessed.validate()?;
        self.waiter.validate()
    }
}

fn default_max_retries() -> usize {
    0
}
fn default_base_delay_ms() -> u64 {
    64
}
fn default_max_delay_ms() -> u64 {
    5000
}
fn default_poll_interval_ms() -> u64 {
    100
}
// 2 minutes at the default interval
fn default_max_attempts() -> u32 {
    1200
}
