//! Configuration management for the truncation engine.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Component-wise validation
mod connection;
mod retry;
mod segment;
use std::env;
use std::fmt::Debug;

pub use connection::*;
pub use retry::*;
pub use segment::*;


use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Environment variable prefix, e.g. `TRUNCATOR__SEGMENT__BATCH_WRITE_LIMIT`
pub const ENV_PREFIX: &str = "TRUNCATOR";

/// Main configuration container for one truncation run
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct TruncatorConfig {
    /// Storage service endpoint, region and credentials
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Segment planning and batch sizing
    #[serde(default)]
    pub segment: SegmentConfig,
    /// Retry and lifecycle polling policies
    #[serde(default)]
    pub retry: RetryPolicies,
}

impl Debug for TruncatorConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("TruncatorConfig")
            .field("connection", &self.connection)
            .field("segment", &self.segment)
            .field("retry", &self.retry)
            .finish()
    }
}

impl TruncatorConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `TRUNCATOR__` prefix (highest priority)
    ///
    /// # Note
    /// Validation is deferred so callers can keep layering overrides. Call
    /// `validate()` before handing the configuration to the engine.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("TRUNCATOR__SEGMENT__BATCH_WRITE_LIMIT", "10");
    /// let cfg = TruncatorConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(environment());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every subsystem and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.connection.validate()?;
        self.segment.validate()?;
        self.retry.validate()?;
        Ok(self)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
