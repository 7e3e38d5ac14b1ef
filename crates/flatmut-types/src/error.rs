//! Error types shared across flatmut crates.

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration source could not be read or deserialized
    #[error("Configuration error: {0}")]
    Config(String),

    /// A configured value is out of range
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
