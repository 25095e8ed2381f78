//! Common error types for AGC

use thiserror::Error;

/// Common result type for AGC operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across AGC crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model reply could not be turned into a compliance report
    #[error("Model output error: {0}")]
    ModelOutput(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
