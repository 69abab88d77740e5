//! Error types for cadence-hub

use std::time::Duration;
use thiserror::Error;

/// Result type for cadence-hub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cadence-hub
#[derive(Debug, Error)]
pub enum Error {
    /// Core error, e.g. malformed creation arguments
    #[error("core error: {0}")]
    Core(#[from] cadence_core::Error),

    /// Configuration value that cannot be used
    #[error("invalid config: {0}")]
    Config(String),

    /// Reading a config file or spawning the consumer failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Config text is not valid RON for [`EngineConfig`](crate::EngineConfig)
    #[error("config parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// The consumer thread panicked outside of an operation
    #[error("consumer thread panicked")]
    ConsumerPanicked,

    /// The consumer stopped before answering
    #[error("consumer disconnected")]
    Disconnected,

    /// The consumer did not answer in time
    #[error("consumer did not answer within {0:?}")]
    Timeout(Duration),
}

// Compile-time check that Error is Send + Sync for thread-safe error propagation.
// This function is never called but will fail to compile if the bound is not satisfied.
fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}
