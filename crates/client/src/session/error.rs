//! Admin login errors.

use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

/// Message shown when the backend could not be reached during login.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again.";

/// Errors that can occur during admin login.
///
/// Credential rejection and transport failures are distinct so callers can
/// tell "wrong password" from "try again".
#[derive(Debug, Error)]
pub enum LoginError {
    /// Backend refused the credentials.
    #[error("{0}")]
    InvalidCredentials(String),

    /// Backend could not be reached.
    #[error("Network error. Please try again.")]
    Network(#[source] ApiError),

    /// Credentials were accepted but could not be persisted.
    #[error("failed to store admin session: {0}")]
    Storage(#[from] StorageError),
}

impl LoginError {
    /// Whether retrying the same credentials may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<ApiError> for LoginError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(_) => Self::Network(err),
            ApiError::Status { message, .. } | ApiError::Rejected(message) => {
                Self::InvalidCredentials(message)
            }
            ApiError::Decode(_) | ApiError::InvalidBaseUrl(_) => {
                Self::InvalidCredentials("Login failed".to_owned())
            }
        }
    }
}
