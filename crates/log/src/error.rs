//! Logger errors

/// Result type for logger operations
pub type LogResult<T> = Result<T, LogError>;

/// Error type for logger setup
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// Filter directive could not be parsed
    #[error("Invalid filter: {0}")]
    Filter(String),

    /// A global subscriber is already installed
    #[error("Logger initialization failed: {0}")]
    Init(String),
}
