//! Settings bound to local reactive state.
//!
//! A [`SettingBinding`] ties one key to a [`SettingSnapshot`] that is always
//! readable synchronously. The value starts at the caller's default, is
//! replaced by the stored value once the mount fetch lands, and is kept
//! fresh by polling. Writes and resets go through an [`AdminGate`] checked
//! at call time.
//!
//! Reads never surface errors: a missing key, a failed request and an
//! undecodable value all leave the current value in place.
//!
//! [`AdminGate`]: crate::session::AdminGate

mod binding;
mod error;

pub use binding::{BindingOptions, SettingBinding, SettingSnapshot};
pub use error::WriteError;
