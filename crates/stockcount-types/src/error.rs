//! Error types for stockcount

use thiserror::Error;

use crate::HardwareMode;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Missing API key (set STOCKCOUNT_API_KEY or run `stockcount config --set-api-key`)")]
    MissingApiKey,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input bytes could not be decoded into a raster
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Output raster could not be serialized
    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Text recognition failed in {mode} mode: {message}")]
    Recognition { mode: HardwareMode, message: String },

    /// Network, auth or rate-limit failure talking to the completion service
    #[error("Completion service error: {0}")]
    CompletionService(String),

    #[error("Malformed model output: {message} | raw: {excerpt}")]
    MalformedModelOutput { message: String, excerpt: String },

    #[error("No records to export")]
    EmptyInput,

    #[error("Excel export error: {0}")]
    Excel(String),
}

impl Error {
    /// Build a `MalformedModelOutput` keeping only the head of the raw response.
    pub fn malformed(message: impl Into<String>, raw: &str) -> Self {
        Error::MalformedModelOutput {
            message: message.into(),
            excerpt: excerpt(raw, EXCERPT_CHARS),
        }
    }
}

/// Number of characters of raw input kept in diagnostic messages
pub const EXCERPT_CHARS: usize = 200;

/// Truncate `text` to at most `max_chars` characters, marking the cut with `...`.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
