use async_trait::async_trait;
use thiserror::Error;

use crate::device::DeviceIdentity;
use crate::ids::SessionId;
use crate::pairing::{IssuedCode, PairingErrorKind};

#[derive(Debug, Error)]
pub enum BackendError {
    /// The user has not entered the code yet.
    #[error("activation pending")]
    Pending,

    #[error("backend unreachable: {0}")]
    Connectivity(String),

    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed backend response: {0}")]
    Malformed(String),
}

impl BackendError {
    pub fn kind(&self) -> PairingErrorKind {
        match self {
            BackendError::Pending => PairingErrorKind::Pending,
            BackendError::Connectivity(_) => PairingErrorKind::Connectivity,
            BackendError::Status { .. } | BackendError::Malformed(_) => {
                PairingErrorKind::Unexpected
            }
        }
    }
}

/// Remote pairing backend.
///
/// `session_id` doubles as the opaque `state` value the backend uses to
/// tie a code request to later activation checks.
#[async_trait]
pub trait DeviceBackendPort: Send + Sync {
    /// Ask the backend for a fresh pairing code.
    async fn request_code(&self, session_id: &SessionId) -> Result<IssuedCode, BackendError>;

    /// Check whether the user has entered the code.
    ///
    /// Returns [`BackendError::Pending`] while activation has not happened.
    async fn check_activation(
        &self,
        session_id: &SessionId,
        access_token: &str,
    ) -> Result<DeviceIdentity, BackendError>;
}
