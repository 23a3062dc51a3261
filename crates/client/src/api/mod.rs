//! HTTP access to the settings backend.
//!
//! This module provides:
//! - [`ApiClient`] for public setting reads and admin-authenticated writes
//! - [`ApiError`] describing transport, status and decoding failures
//!
//! Authenticated requests carry the admin token in the `X-Admin-Token`
//! header rather than an `Authorization` bearer scheme.

mod client;
mod error;

pub use client::ApiClient;
pub use error::ApiError;
