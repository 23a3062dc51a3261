//! Persisted admin credentials.
//!
//! The admin token and the admin identity are stored side by side under the
//! fixed keys `adminToken` and `adminUser`, and are always written and
//! cleared together. Only [`AdminSession`](crate::session::AdminSession)
//! mutates a store.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use mission_core::{AdminIdentity, AdminToken};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage key of the admin token.
pub const TOKEN_KEY: &str = "adminToken";
/// Storage key of the admin identity JSON.
pub const IDENTITY_KEY: &str = "adminUser";

/// Errors that can occur when reading or writing stored credentials.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem access failed.
    #[error("session storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be parsed.
    #[error("session storage is corrupt: {0}")]
    Corrupt(String),

    /// Stored data could not be serialized.
    #[error("session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No location to store the session in.
    #[error("no session storage location available")]
    NoLocation,
}

/// Admin token plus the profile it was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    /// Admin credential.
    #[serde(rename = "adminToken")]
    pub token: AdminToken,
    /// Admin profile; absent in sessions saved before identity was persisted.
    #[serde(rename = "adminUser", default)]
    pub identity: Option<AdminIdentity>,
}

/// Persistent storage for admin credentials.
pub trait TokenStore: Send + Sync {
    /// Load stored credentials, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read or is corrupt.
    fn load(&self) -> Result<Option<StoredCredentials>, StorageError>;

    /// Replace stored credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be written.
    fn save(&self, credentials: &StoredCredentials) -> Result<(), StorageError>;

    /// Remove token and identity in one operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be written.
    fn clear(&self) -> Result<(), StorageError>;
}

/// In-process credential store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<StoredCredentials>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `credentials`.
    #[must_use]
    pub fn with_credentials(credentials: StoredCredentials) -> Self {
        Self {
            slot: Mutex::new(Some(credentials)),
        }
    }

    /// Current contents, for inspection.
    #[must_use]
    pub fn snapshot(&self) -> Option<StoredCredentials> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<StoredCredentials>, StorageError> {
        Ok(self.snapshot())
    }

    fn save(&self, credentials: &StoredCredentials) -> Result<(), StorageError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Credential store backed by a JSON file.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so readers never see a half-written session. On Unix the file is created
/// with mode `0600`.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store credentials at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store credentials at `<config dir>/mission/session.json`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoLocation`] if the platform has no config
    /// directory.
    pub fn default_location() -> Result<Self, StorageError> {
        let dir = dirs::config_dir().ok_or(StorageError::NoLocation)?;
        Ok(Self::new(dir.join("mission").join("session.json")))
    }

    /// Path of the session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<StoredCredentials>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Corrupt(e.to_string()))
    }

    fn save(&self, credentials: &StoredCredentials) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec_pretty(credentials)?;
        let temp = self.temp_path();

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&temp)?;
        file.write_all(&json)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use mission_core::AdminRole;

    use super::*;

    fn credentials() -> StoredCredentials {
        StoredCredentials {
            token: AdminToken::new("tok-42"),
            identity: Some(AdminIdentity {
                id: "1".to_string(),
                username: "ops".to_string(),
                role: AdminRole::Admin,
            }),
        }
    }

    #[test]
    fn test_stored_credentials_use_fixed_keys() {
        let json = serde_json::to_value(credentials()).expect("serialize");
        assert_eq!(json[TOKEN_KEY], "tok-42");
        assert_eq!(json[IDENTITY_KEY]["username"], "ops");
    }

    #[test]
    fn test_memory_store_round_trip_and_clear() {
        let store = MemoryTokenStore::new();
        assert!(store.load().expect("load").is_none());

        store.save(&credentials()).expect("save");
        assert_eq!(store.load().expect("load"), Some(credentials()));

        store.clear().expect("clear");
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(dir.path().join("session.json"));
        assert!(store.load().expect("load").is_none());
        store.clear().expect("clearing a missing file succeeds");
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("session.json");

        FileTokenStore::new(&path).save(&credentials()).expect("save");
        let loaded = FileTokenStore::new(&path).load().expect("load");
        assert_eq!(loaded, Some(credentials()));
        assert!(!dir.path().join("nested").join("session.json.tmp").exists());
    }

    #[test]
    fn test_file_store_clear_removes_both_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(dir.path().join("session.json"));
        store.save(&credentials()).expect("save");

        store.clear().expect("clear");
        assert!(!store.path().exists());
        assert!(store.load().expect("load").is_none());
    }

    #[test]
    fn test_file_store_reports_corruption() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").expect("write");

        assert!(matches!(
            FileTokenStore::new(&path).load(),
            Err(StorageError::Corrupt(_))
        ));
    }

    #[test]
    fn test_identity_is_optional_on_load() {
        let creds: StoredCredentials =
            serde_json::from_str(r#"{"adminToken": "legacy"}"#).expect("deserialize");
        assert_eq!(creds.token.expose(), "legacy");
        assert!(creds.identity.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(dir.path().join("session.json"));
        store.save(&credentials()).expect("save");

        let mode = fs::metadata(store.path()).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
