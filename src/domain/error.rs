//! Domain-level error types for cardscan.
//!
//! All errors are typed with `thiserror`. Every variant renders to a single
//! line that is shown to the user verbatim in the error slot.

use thiserror::Error;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// The request never produced a response (DNS, connect, TLS, body read).
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The backend answered with a non-2xx status.
    #[error("HTTP {status} {status_text} — {detail}")]
    Http {
        status: u16,
        status_text: String,
        detail: String,
    },

    /// Input rejected before any request was issued.
    #[error("{message}")]
    Validation { message: String },

    /// Nothing (or nothing usable) to export.
    #[error("{message}")]
    Export { message: String },

    /// The backend answered 2xx with a body of the wrong shape.
    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    /// JSON encoding or decoding failed.
    #[error("JSON parse error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Spreadsheet encoding failed.
    #[error("Spreadsheet error: {message}")]
    Spreadsheet { message: String },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create a network error from a transport failure.
    pub fn network(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// HTTP status carried by this error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = AppError::Http {
            status: 500,
            status_text: "Internal Server Error".into(),
            detail: "db down".into(),
        };
        assert_eq!(err.to_string(), "HTTP 500 Internal Server Error — db down");
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_validation_display_is_bare() {
        let err = AppError::validation("Choose an image first");
        assert_eq!(err.to_string(), "Choose an image first");
        assert_eq!(err.status(), None);
    }
}
