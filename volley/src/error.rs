//! Error types for the fan-out engine.

use thiserror::Error;

/// Errors that can occur while submitting or executing instructions.
#[derive(Error, Debug)]
pub enum EngineError {
    /// `execute` was called with no instructions queued
    #[error("no instructions submitted")]
    EmptyBatch,

    /// An instruction failed validation before dispatch
    #[error("invalid instruction: {reason}")]
    InvalidInstruction {
        /// What was wrong with it
        reason: String,
    },

    /// Error from a curl easy handle
    #[error("curl error: {source}")]
    Curl {
        /// Source curl error
        #[from]
        source: curl::Error,
    },

    /// Error from the curl multi handle
    #[error("curl multi error: {source}")]
    Multi {
        /// Source curl multi error
        #[from]
        source: curl::MultiError,
    },

    /// Segment or worker-pool error
    #[error("worker pool error: {source}")]
    Pool {
        /// Source pool error
        #[from]
        source: volley_pool::PoolError,
    },

    /// Configuration could not be parsed
    #[error("config error: {source}")]
    Config {
        /// Source TOML error
        #[from]
        source: toml::de::Error,
    },
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
