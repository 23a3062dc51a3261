//! Setting write errors.

use thiserror::Error;

use crate::api::ApiError;

/// Errors that can occur when writing or resetting a setting.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// No admin is authenticated; no request was sent.
    #[error("Admin authentication required")]
    NotAuthenticated,

    /// Backend refused the write; carries its error text.
    #[error("{0}")]
    Rejected(String),

    /// Backend could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// Value could not be serialized to JSON.
    #[error("Failed to encode value: {0}")]
    Encode(String),
}

impl From<ApiError> for WriteError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(e) => Self::Network(e.to_string()),
            ApiError::Status { message, .. }
            | ApiError::Rejected(message)
            | ApiError::Decode(message)
            | ApiError::InvalidBaseUrl(message) => Self::Rejected(message),
        }
    }
}
