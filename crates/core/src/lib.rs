//! Mission Core - Shared types library.
//!
//! This crate provides common types used across all Mission components:
//! - `client` - Settings synchronization client and admin session manager
//! - `cli` - Command-line tools for operators
//! - `integration-tests` - Fake backend and end-to-end tests
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Setting keys, admin identity and token, backend wire types
//! - [`values`] - Typed values stored under well-known setting keys

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;
pub mod values;

pub use types::*;
