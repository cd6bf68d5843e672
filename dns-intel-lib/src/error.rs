//! Error handling for lookup operations.
//!
//! This module defines one error type covering every way a lookup can fail,
//! from bad input that never reaches the network to malformed API responses.

use std::fmt;
use std::time::Duration;

/// Main error type for dns-intel operations.
///
/// Variants group into the failure classes a caller cares about:
/// validation and precondition failures block a submission before any
/// network traffic, while transport, protocol, parse and shape failures
/// come back from the API call and are subject to the retry policy.
#[derive(Debug, Clone)]
pub enum DnsIntelError {
    /// Domain input failed validation
    InvalidDomain { domain: String, reason: String },

    /// No challenge token was available for the submission
    MissingChallengeToken,

    /// Network-related errors (connection refused, DNS failure, reset, ...)
    NetworkError {
        message: String,
        source: Option<String>,
    },

    /// The request was aborted after exceeding its time budget
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// The API answered with a non-2xx status
    ApiError { status: u16, message: String },

    /// A non-empty response body was not valid JSON
    ParseError {
        message: String,
        content: Option<String>,
    },

    /// Well-formed JSON that lacks the expected result fields
    UnexpectedResponse { message: String },

    /// Configuration errors (invalid settings, bad TOML, ...)
    ConfigError { message: String },

    /// File I/O errors for history, config and export files
    FileError { path: String, message: String },

    /// An export was requested before any lookup succeeded
    NoResult,

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl DnsIntelError {
    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new API status error.
    pub fn api<M: Into<String>>(status: u16, message: M) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Create a new parse error.
    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::ParseError {
            message: message.into(),
            content: None,
        }
    }

    /// Create a new unexpected-response error.
    pub fn unexpected<M: Into<String>>(message: M) -> Self {
        Self::UnexpectedResponse {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error came back from an API attempt and may be retried.
    ///
    /// Validation and precondition failures are never retried: the user has
    /// to correct the input first.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. }
                | Self::Timeout { .. }
                | Self::ApiError { .. }
                | Self::ParseError { .. }
                | Self::UnexpectedResponse { .. }
        )
    }

    /// The message shown to the user for this error.
    ///
    /// API-provided messages are surfaced verbatim, without the category
    /// prefix used by `Display`.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidDomain { reason, .. } => reason.clone(),
            Self::MissingChallengeToken => {
                "Please complete the Turnstile verification".to_string()
            }
            Self::ApiError { message, .. } => message.clone(),
            Self::ParseError { message, .. } => message.clone(),
            Self::UnexpectedResponse { message } => message.clone(),
            Self::NoResult => "No analysis data available".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for DnsIntelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomain { domain, reason } => {
                if domain.is_empty() {
                    write!(f, "Invalid domain: {}", reason)
                } else {
                    write!(f, "Invalid domain '{}': {}", domain, reason)
                }
            }
            Self::MissingChallengeToken => {
                write!(f, "Challenge token required: complete the Turnstile verification")
            }
            Self::NetworkError { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::ApiError { status, message } => {
                write!(f, "API error (HTTP {}): {}", status, message)
            }
            Self::ParseError { message, content: _ } => {
                write!(f, "Parse error: {}", message)
            }
            Self::UnexpectedResponse { message } => {
                write!(f, "Unexpected response: {}", message)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::NoResult => write!(f, "No analysis data available"),
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for DnsIntelError {}

impl From<reqwest::Error> for DnsIntelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout("HTTP request", Duration::ZERO)
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<serde_json::Error> for DnsIntelError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError {
            message: format!("JSON parsing failed: {}", err),
            content: None,
        }
    }
}

impl From<std::io::Error> for DnsIntelError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<url::ParseError> for DnsIntelError {
    fn from(err: url::ParseError) -> Self {
        Self::ConfigError {
            message: format!("Invalid URL: {}", err),
        }
    }
}
