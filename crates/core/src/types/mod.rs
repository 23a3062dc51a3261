//! Core types for Mission.
//!
//! This module provides type-safe wrappers for settings and admin concepts.

pub mod admin;
pub mod key;
pub mod wire;

pub use admin::{AdminIdentity, AdminRole, AdminToken};
pub use key::{SettingKey, SettingKeyError};
pub use wire::*;
