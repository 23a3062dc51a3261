//! Settings backend errors.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the settings backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request never produced a response (connection refused, reset, DNS...).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    ///
    /// `message` is the backend's error text when it sent one.
    #[error("{message}")]
    Status {
        /// HTTP status code.
        status: StatusCode,
        /// Backend error text or a generic description.
        message: String,
    },

    /// Backend answered 2xx but refused the operation in the body.
    #[error("{0}")]
    Rejected(String),

    /// Response body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),

    /// Base URL cannot carry path segments.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    /// Whether the failure happened below HTTP (retryable by the user).
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// HTTP status of the failure, if the backend responded.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
