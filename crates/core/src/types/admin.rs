//! Admin identity and credential types.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use secrecy::{ExposeSecret, SecretString};

/// Admin role as reported by the backend.
///
/// Roles the client does not know about are preserved verbatim in
/// [`AdminRole::Other`] so a newer backend never breaks login.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AdminRole {
    /// Full access including admin account management.
    SuperAdmin,
    /// Full access to settings and content.
    Admin,
    /// Content editing only.
    Editor,
    /// A role this client version does not recognize.
    Other(String),
}

impl AdminRole {
    /// Get the wire representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::Editor => "editor",
            Self::Other(role) => role,
        }
    }
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for AdminRole {
    fn from(s: &str) -> Self {
        match s {
            "super_admin" => Self::SuperAdmin,
            "admin" => Self::Admin,
            "editor" => Self::Editor,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl Serialize for AdminRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AdminRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

/// Minimal admin profile returned by login and verify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminIdentity {
    /// Backend identifier (numeric or string ids are both accepted).
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    /// Login name.
    pub username: String,
    /// Permission level.
    pub role: AdminRole,
}

fn id_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// Opaque admin credential sent in the `X-Admin-Token` header.
///
/// The raw value is only reachable through [`AdminToken::expose`]; `Debug`
/// output is redacted.
#[derive(Clone)]
pub struct AdminToken(SecretString);

impl AdminToken {
    /// Wrap a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Get the raw token value.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Whether the token is empty (a backend bug, never a valid credential).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for AdminToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AdminToken([REDACTED])")
    }
}

impl PartialEq for AdminToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for AdminToken {}

impl Serialize for AdminToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose())
    }
}

impl<'de> Deserialize<'de> for AdminToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}
