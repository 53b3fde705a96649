use serde::{Deserialize, Serialize};

/// Closed classification of everything that can go wrong during pairing.
///
/// Port errors are mapped onto these kinds explicitly (see
/// `BackendError::kind` and `CredentialStoreError::kind`); the state machine
/// only ever reasons about the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PairingErrorKind {
    /// The user has not finished activation yet. Not a failure.
    Pending,
    /// The backend could not be reached.
    Connectivity,
    /// The credential store rejected the identity.
    Persistence,
    /// Anything else. Always fatal to the current session.
    Unexpected,
}

impl std::fmt::Display for PairingErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PairingErrorKind::Pending => "pending",
            PairingErrorKind::Connectivity => "connectivity",
            PairingErrorKind::Persistence => "persistence",
            PairingErrorKind::Unexpected => "unexpected",
        };
        f.write_str(name)
    }
}
