use thiserror::Error;

use crate::device::DeviceIdentity;
use crate::pairing::PairingErrorKind;

#[derive(Debug, Error)]
pub enum CredentialStoreError {
    #[error("credential store failed: {0}")]
    Store(String),

    #[error("stored identity corrupt: {0}")]
    Corrupt(String),
}

impl CredentialStoreError {
    pub fn kind(&self) -> PairingErrorKind {
        PairingErrorKind::Persistence
    }
}

/// Durable storage for the device identity.
pub trait CredentialStorePort: Send + Sync {
    /// Load the stored identity, if the device has been paired.
    fn load(&self) -> Result<Option<DeviceIdentity>, CredentialStoreError>;

    /// Store the identity. Overwrites any previous one.
    fn save(&self, identity: &DeviceIdentity) -> Result<(), CredentialStoreError>;
}

#[cfg(test)]
mockall::mock! {
    pub CredentialStore {}

    impl CredentialStorePort for CredentialStore {
        fn load(&self) -> Result<Option<DeviceIdentity>, CredentialStoreError>;
        fn save(&self, identity: &DeviceIdentity) -> Result<(), CredentialStoreError>;
    }
}
