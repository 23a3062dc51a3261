//! Request and response bodies exchanged with the settings backend.
//!
//! | Method | Path | Body | Response |
//! |---|---|---|---|
//! | GET | `/settings/{key}` | - | [`SettingEnvelope`] |
//! | PUT | `/admin/settings/{key}` | [`WriteSettingBody`] | - |
//! | DELETE | `/admin/settings/{key}` | - | - |
//! | POST | `/admin/auth/login` | [`LoginRequest`] | [`LoginResponse`] |
//! | POST | `/admin/auth/logout` | - | - |
//! | GET | `/admin/auth/verify` | - | [`VerifyResponse`] |
//! | GET | `/admin/all-settings` | - | [`AllSettingsResponse`] |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::admin::{AdminIdentity, AdminToken};

/// Header carrying the admin credential on authenticated requests.
pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// Public read of a single setting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingEnvelope {
    /// Whether the backend considers the read successful.
    #[serde(default)]
    pub success: bool,
    /// Stored value; `None` (or JSON `null`) when the key was never written.
    #[serde(default)]
    pub value: Option<Value>,
}

impl SettingEnvelope {
    /// The stored value, if the read succeeded and a value is present.
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        if !self.success {
            return None;
        }
        self.value.filter(|v| !v.is_null())
    }
}

/// Body of an admin setting write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteSettingBody {
    /// New value for the key.
    pub value: Value,
}

/// Credential exchange request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Admin username.
    pub username: String,
    /// Admin password.
    pub password: String,
}

/// Credential exchange response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Whether the credentials were accepted.
    #[serde(default)]
    pub success: bool,
    /// Issued admin token.
    #[serde(default)]
    pub token: Option<AdminToken>,
    /// Authenticated admin profile.
    #[serde(default)]
    pub admin: Option<AdminIdentity>,
    /// Rejection reason.
    #[serde(default)]
    pub error: Option<String>,
}

/// Token verification response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    /// Profile of the admin the token belongs to.
    pub admin: AdminIdentity,
}

/// Error payload returned by the backend on non-success responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Primary error text.
    #[serde(default)]
    pub error: Option<String>,
    /// Alternative error text used by some endpoints.
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Backend error text, preferring `error` over `message`.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// Bulk settings dump for monitoring.
///
/// The backend wraps the map as `{"settings": {...}}`; a bare map is
/// accepted too.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllSettingsResponse {
    /// `{"success": true, "settings": {...}}`
    Wrapped {
        /// Every stored key with its value.
        settings: BTreeMap<String, Value>,
    },
    /// `{...}`
    Bare(BTreeMap<String, Value>),
}

impl AllSettingsResponse {
    /// Consume into the key/value map.
    #[must_use]
    pub fn into_map(self) -> BTreeMap<String, Value> {
        match self {
            Self::Wrapped { settings } => settings,
            Self::Bare(map) => map,
        }
    }
}
