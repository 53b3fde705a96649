use serde::{Deserialize, Serialize};

/// Durable credential identifying a paired device to the backend.
///
/// Produced by a successful activation check and owned by the credential
/// store once saved.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Device UUID assigned by the backend.
    pub uuid: String,
    /// Long-lived access token.
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds, if the backend reported one.
    #[serde(default)]
    pub expires_in_secs: Option<u64>,
}

impl DeviceIdentity {
    pub fn new(uuid: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            access_token: access_token.into(),
            refresh_token: None,
            expires_in_secs: None,
        }
    }
}

// Tokens stay out of logs.
impl std::fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("uuid", &self.uuid)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in_secs", &self.expires_in_secs)
            .finish()
    }
}
