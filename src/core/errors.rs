//! Custom error types for translation operations

use std::fmt;
use thiserror::Error;

/// Translation-related errors
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Malformed or missing request fields
    #[error("{message}")]
    ValidationError {
        /// Human-readable reason
        message: String,
    },

    /// Missing or invalid credentials / settings
    #[error("{message}")]
    ConfigError {
        /// Human-readable reason
        message: String,
    },

    /// Remote document fetch failed
    #[error("Failed to download file: {message}")]
    RetrievalError {
        /// Human-readable reason
        message: String,
    },

    /// Translation provider call failed
    #[error("DeepL API error: {message}")]
    ProviderError {
        /// HTTP status returned by the provider, if any
        status: Option<u16>,
        /// Human-readable reason
        message: String,
    },

    /// Anything unexpected
    #[error("Internal error: {0}")]
    InternalError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Coarse classification used at the HTTP boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad request input (400)
    Validation,
    /// Missing or invalid configuration
    Config,
    /// Remote document could not be fetched
    Retrieval,
    /// Translation provider failure
    Provider,
    /// Unexpected failure
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::Config => "config_error",
            ErrorKind::Retrieval => "retrieval_error",
            ErrorKind::Provider => "provider_error",
            ErrorKind::Internal => "internal_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl TranslationError {
    /// Validation error with `message`
    pub fn validation(message: impl Into<String>) -> Self {
        TranslationError::ValidationError {
            message: message.into(),
        }
    }

    /// Configuration error with `message`
    pub fn config(message: impl Into<String>) -> Self {
        TranslationError::ConfigError {
            message: message.into(),
        }
    }

    /// Retrieval error with `message`
    pub fn retrieval(message: impl Into<String>) -> Self {
        TranslationError::RetrievalError {
            message: message.into(),
        }
    }

    /// Provider error with an optional HTTP status
    pub fn provider(status: Option<u16>, message: impl Into<String>) -> Self {
        TranslationError::ProviderError {
            status,
            message: message.into(),
        }
    }

    /// Classify this error into one of the five taxonomy kinds
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranslationError::ValidationError { .. } => ErrorKind::Validation,
            TranslationError::ConfigError { .. } => ErrorKind::Config,
            TranslationError::RetrievalError { .. } => ErrorKind::Retrieval,
            TranslationError::ProviderError { .. } => ErrorKind::Provider,
            TranslationError::InternalError(_)
            | TranslationError::IoError(_)
            | TranslationError::HttpError(_)
            | TranslationError::JsonError(_) => ErrorKind::Internal,
        }
    }
}

impl From<anyhow::Error> for TranslationError {
    fn from(err: anyhow::Error) -> Self {
        TranslationError::InternalError(err.to_string())
    }
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;
