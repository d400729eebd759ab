//! # taplock-log
//!
//! Subscriber setup for taplock binaries and tests. Library crates only emit
//! `tracing` events; this crate decides where they go.
//!
//! ```no_run
//! let _guard = taplock_log::init()?;
//! tracing::info!(resources = 3, "Opening bench");
//! # Ok::<(), taplock_log::LogError>(())
//! ```

#![forbid(unsafe_code)]

mod builder;
mod config;
mod error;

pub use builder::{LoggerBuilder, LoggerGuard};
pub use config::{Config, Format};
pub use error::{LogError, LogResult};

/// Initialize logging from the environment (`TAPLOCK_LOG`, `RUST_LOG`,
/// `TAPLOCK_LOG_FORMAT`).
pub fn init() -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(Config::from_env()).build()
}

/// Initialize logging with an explicit configuration.
pub fn init_with(config: Config) -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(config).build()
}

/// Install a test-friendly subscriber once per process.
///
/// Safe to call from every test; later calls are no-ops. Output goes through
/// the libtest capture so it only shows for failing tests.
pub fn init_test() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        // Another harness may already own the global subscriber.
        let _ = LoggerBuilder::from_config(Config::test()).build();
    });
}
