//! Error types for Feedscope.

use thiserror::Error;

/// Library-level error type for Feedscope operations.
#[derive(Error, Debug)]
pub enum FeedscopeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Model error: {0}")]
    Model(String),
}

/// Result type alias for Feedscope operations.
pub type Result<T> = std::result::Result<T, FeedscopeError>;
