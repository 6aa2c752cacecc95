//! Error types for feather_animation
//!
//! The engine itself never fails; these cover parsing names and
//! configuration files.

use thiserror::Error;

/// Errors raised while reading or writing animation configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeatherError {
    /// Algorithm name other than `spring` or `decay`
    #[error("Unknown animation algorithm '{0}' (expected \"spring\" or \"decay\")")]
    UnknownAlgorithm(String),

    /// Malformed TOML configuration
    #[error("Failed to parse animation config: {0}")]
    ConfigParse(String),

    /// Configuration could not be rendered as TOML
    #[error("Failed to serialize animation config: {0}")]
    ConfigSerialize(String),
}

impl From<toml::de::Error> for FeatherError {
    fn from(err: toml::de::Error) -> Self {
        FeatherError::ConfigParse(err.to_string())
    }
}

impl From<toml::ser::Error> for FeatherError {
    fn from(err: toml::ser::Error) -> Self {
        FeatherError::ConfigSerialize(err.to_string())
    }
}

/// Result type for feather_animation operations
pub type Result<T> = std::result::Result<T, FeatherError>;
