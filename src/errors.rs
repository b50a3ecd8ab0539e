/*!
 * Error types for the linetrans application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when talking to the chat-completion API
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Non-2xx HTTP status (or an error object returned by the API)
    #[error("API error {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body as returned by the API
        body: String,
    },

    /// The request did not complete within the configured wall-clock limit
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Connection-level failure (DNS, TLS, reset, broken stream)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The body arrived but could not be decoded
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// The body decoded but contained no usable text
    #[error("Empty response from API")]
    EmptyResponse,

    /// The body has text but no line in the `ID:::Text` protocol
    #[error("Response has no 'ID:::Text' lines: {0}")]
    UnparseableResponse(String),
}

impl ProviderError {
    /// Whether a failed call may succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Api { status, .. } => is_retryable_status(*status),
            // proxies answer with HTML error pages during outages
            Self::Timeout(_)
            | Self::Transport(_)
            | Self::EmptyResponse
            | Self::InvalidResponse(_)
            | Self::UnparseableResponse(_) => true,
        }
    }

    /// Progress message for the host, using the recognizable error-class prefixes
    pub fn progress_message(&self) -> String {
        match self {
            Self::Api { status, body } => format!("API Error: {} {}", status, truncate(body, 200)),
            other => format!("Exception: {}", other),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_decode() {
            Self::InvalidResponse(error.to_string())
        } else if let Some(status) = error.status() {
            Self::Api {
                status: status.as_u16(),
                body: error.to_string(),
            }
        } else {
            Self::Transport(error.to_string())
        }
    }
}

fn is_retryable_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..600).contains(&status)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let mut out: String = text.chars().take(max_chars).collect();
        out.push('…');
        out
    } else {
        text.to_string()
    }
}

/// Errors that can occur while parsing an input file into units
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UnitParseError {
    /// The same ID appeared twice
    #[error("Duplicate ID '{id}' on line {line}: {content}")]
    DuplicateId {
        /// 1-based line number of the second occurrence
        line: usize,
        /// The repeated ID
        id: String,
        /// The offending line
        content: String,
    },
}

/// Errors raised by configuration validation
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    /// A field holds a value outside its accepted range
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Field name as it appears in the config file
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error while parsing the input file
    #[error("Parse error: {0}")]
    Parse(#[from] UnitParseError),

    /// Error in the run configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
