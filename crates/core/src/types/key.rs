//! Setting key type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`SettingKey`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingKeyError {
    /// The input string is empty.
    #[error("setting key cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("setting key must be at most {max} bytes")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character that cannot appear in a key.
    #[error("setting key contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Identifier of a single backend-persisted setting.
///
/// Each logical UI concern (an editable text field, a timer position, a
/// countdown target) owns exactly one key.
///
/// ## Constraints
///
/// - Length: 1-128 bytes
/// - No `/` (a key is always a single URL path segment)
/// - No control characters or whitespace
///
/// ## Examples
///
/// ```
/// use mission_core::SettingKey;
///
/// assert!(SettingKey::parse("countdown_target").is_ok());
/// assert!(SettingKey::parse("hero.title").is_ok());
///
/// assert!(SettingKey::parse("").is_err());
/// assert!(SettingKey::parse("a/b").is_err());
/// assert!(SettingKey::parse("with space").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct SettingKey(String);

impl SettingKey {
    /// Maximum length of a setting key in bytes.
    pub const MAX_LENGTH: usize = 128;

    /// Parse a `SettingKey` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than 128 bytes, or
    /// contains `/`, whitespace or a control character.
    pub fn parse(s: &str) -> Result<Self, SettingKeyError> {
        if s.is_empty() {
            return Err(SettingKeyError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(SettingKeyError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if let Some(c) = s
            .chars()
            .find(|c| *c == '/' || c.is_whitespace() || c.is_control())
        {
            return Err(SettingKeyError::InvalidCharacter(c));
        }

        Ok(Self(s.to_owned()))
    }

    /// Get the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert into the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SettingKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SettingKey {
    type Error = SettingKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for SettingKey {
    type Error = SettingKeyError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SettingKey> for String {
    fn from(key: SettingKey) -> Self {
        key.0
    }
}

impl core::str::FromStr for SettingKey {
    type Err = SettingKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
