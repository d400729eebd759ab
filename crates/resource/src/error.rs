//! Error types for dependency analysis and lock-hook dispatch
use thiserror::Error;

use crate::cycle::Diagnostic;

/// Result type for resource operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for resource analysis and lock-manager operations.
///
/// Graph analysis itself never fails; it records [`Diagnostic`]s. Errors
/// arise when a caller turns those diagnostics into a refusal to open, when
/// an open order is requested from a cyclic graph, or when a lock hook
/// aborts the open/close sequence.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration is invalid
    #[error("Configuration error: {message}")]
    Configuration {
        /// The error message
        message: String,
    },

    /// Dispatch was cancelled before the next hook could run
    #[error("Lock hook dispatch cancelled during {phase}")]
    Cancelled {
        /// The dispatch phase (`before_open` or `after_close`)
        phase: &'static str,
    },

    /// A lock hook refused to proceed
    #[error("Lock hook '{hook}' failed during {phase}: {reason}")]
    Hook {
        /// The hook name
        hook: String,
        /// The dispatch phase
        phase: &'static str,
        /// Why the hook failed
        reason: String,
    },

    /// A lock hook exceeded the configured timeout
    #[error("Lock hook '{hook}' timed out after {timeout_ms}ms during {phase}")]
    HookTimeout {
        /// The hook name
        hook: String,
        /// The dispatch phase
        phase: &'static str,
        /// The timeout in milliseconds
        timeout_ms: u64,
    },

    /// An open order was requested from a graph containing cycles
    #[error("Circular dependency detected: {cycle}")]
    CircularDependency {
        /// The offending resources, comma separated
        cycle: String,
    },

    /// Analysis found resource wiring errors
    #[error("{} resource dependency error(s) detected", diagnostics.len())]
    DependencyErrors {
        /// Every diagnostic reported by the analysis pass
        diagnostics: Vec<Diagnostic>,
    },
}

impl Error {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a hook failure; hooks return this to abort the sequence.
    pub fn hook(hook: impl Into<String>, phase: &'static str, reason: impl Into<String>) -> Self {
        Self::Hook {
            hook: hook.into(),
            phase,
            reason: reason.into(),
        }
    }

    /// Check if this error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::HookTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_error_display() {
        let err = Error::hook("bench-lock", "before_open", "lock held by station 4");
        assert_eq!(
            err.to_string(),
            "Lock hook 'bench-lock' failed during before_open: lock held by station 4"
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn timeout_is_retryable() {
        let err = Error::HookTimeout {
            hook: "slow".into(),
            phase: "after_close",
            timeout_ms: 250,
        };
        assert!(err.is_retryable());
        assert!(err.to_string().contains("250ms"));
    }

    #[test]
    fn dependency_errors_counts_diagnostics() {
        let err = Error::DependencyErrors {
            diagnostics: vec![Diagnostic::SelfReference {
                resource: "DMM".into(),
            }],
        };
        assert_eq!(err.to_string(), "1 resource dependency error(s) detected");
    }
}
