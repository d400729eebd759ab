//! Analyzer and lock-manager configuration

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Settings for [`DependencyAnalyzer`](crate::analyzer::DependencyAnalyzer).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct AnalyzerConfig {
    /// Log a warning for every root member left without a resource
    pub report_unset_resources: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            report_unset_resources: true,
        }
    }
}

/// Settings for [`LockManager`](crate::lock::LockManager).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct LockConfig {
    /// Upper bound for a single hook invocation; `None` waits indefinitely
    pub hook_timeout: Option<Duration>,
}

/// Combined configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct Config {
    /// Analysis settings
    pub analyzer: AnalyzerConfig,
    /// Hook dispatch settings
    pub locks: LockConfig,
}

impl Config {
    /// Validate the configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.locks.hook_timeout == Some(Duration::ZERO) {
            return Err(Error::configuration("locks.hook_timeout must be non-zero"));
        }
        Ok(())
    }

    /// Parse and validate a JSON document.
    #[cfg(feature = "serde")]
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::configuration(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}
