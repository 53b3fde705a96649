use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vp_core::ports::{CredentialStoreError, CredentialStorePort};
use vp_core::DeviceIdentity;

const IDENTITY_DIR: &str = "identity";
const IDENTITY_FILE: &str = "identity2.json";

/// Default identity location under the platform data directory.
pub fn default_identity_path() -> Option<PathBuf> {
    dirs::data_dir().map(|root| root.join("voxpair").join(IDENTITY_DIR).join(IDENTITY_FILE))
}

/// On-disk record: the identity plus when it was written.
#[derive(Serialize, Deserialize)]
struct StoredIdentity {
    #[serde(flatten)]
    identity: DeviceIdentity,
    saved_at: DateTime<Utc>,
}

/// Device identity kept as a JSON file, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store under `<app_data_root>/identity/identity2.json`.
    pub fn in_data_dir(app_data_root: &Path) -> Self {
        Self::new(app_data_root.join(IDENTITY_DIR).join(IDENTITY_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_identity(&self) -> Result<Option<DeviceIdentity>, CredentialStoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(CredentialStoreError::Store(format!(
                    "failed to read identity file: {err}"
                )))
            }
        };

        let stored: StoredIdentity = serde_json::from_slice(&bytes).map_err(|err| {
            CredentialStoreError::Corrupt(format!("failed to decode identity file: {err}"))
        })?;
        Ok(Some(stored.identity))
    }

    fn write_identity(&self, identity: &DeviceIdentity) -> Result<(), CredentialStoreError> {
        let parent = self.path.parent().ok_or_else(|| {
            CredentialStoreError::Store("identity path missing parent directory".to_string())
        })?;
        std::fs::create_dir_all(parent).map_err(|err| {
            CredentialStoreError::Store(format!("failed to create identity dir: {err}"))
        })?;

        let record = StoredIdentity {
            identity: identity.clone(),
            saved_at: Utc::now(),
        };
        let bytes = serde_json::to_vec_pretty(&record).map_err(|err| {
            CredentialStoreError::Store(format!("failed to encode identity: {err}"))
        })?;

        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, bytes).map_err(|err| {
            CredentialStoreError::Store(format!("failed to write identity temp file: {err}"))
        })?;
        let committed = restrict_permissions(&tmp_path).and_then(|()| {
            std::fs::rename(&tmp_path, &self.path).map_err(|err| {
                CredentialStoreError::Store(format!("failed to commit identity file: {err}"))
            })
        });
        if let Err(err) = committed {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(err);
        }

        debug!(path = %self.path.display(), uuid = %identity.uuid, "identity file written");
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), CredentialStoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(|err| {
        CredentialStoreError::Store(format!("failed to restrict identity file: {err}"))
    })
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), CredentialStoreError> {
    Ok(())
}

impl CredentialStorePort for FileCredentialStore {
    fn load(&self) -> Result<Option<DeviceIdentity>, CredentialStoreError> {
        self.read_identity()
    }

    fn save(&self, identity: &DeviceIdentity) -> Result<(), CredentialStoreError> {
        self.write_identity(identity)
    }
}
