//! Pairing session model.

use serde::{Deserialize, Serialize};

use crate::device::DeviceIdentity;
use crate::ids::SessionId;

/// Lifecycle status of a pairing session.
///
/// 配对会话状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairingStatus {
    /// No pairing attempt running.
    Idle,
    /// Waiting for the backend to hand out a code.
    AwaitingCode,
    /// Code issued and shown to the user, poller not yet armed.
    CodePresented,
    /// Activation checks are running.
    Polling,
    /// Terminal: identity saved.
    Activated,
    /// Terminal: session given up.
    Aborted,
}

impl PairingStatus {
    /// Whether this status holds the single-flight slot.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            PairingStatus::AwaitingCode | PairingStatus::CodePresented | PairingStatus::Polling
        )
    }
}

/// Code handed out by the backend for one session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedCode {
    /// Short code the user types on the companion page.
    pub code: String,
    /// Short-lived token exchanged for the device identity on activation.
    pub access_token: String,
    /// Seconds until the code stops being valid. Zero means "not reported".
    pub expires_in_secs: u64,
}

impl std::fmt::Debug for IssuedCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedCode")
            .field("code", &self.code)
            .field("access_token", &"<redacted>")
            .field("expires_in_secs", &self.expires_in_secs)
            .finish()
    }
}

/// One pairing attempt.
///
/// At most one session is active per device. `session_id` is fixed at
/// creation and the code is fixed once issued; a restart always builds a new
/// session instead of mutating the old one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingSession {
    session_id: SessionId,
    code: Option<IssuedCode>,
    /// Monotonic milliseconds.
    issued_at_ms: Option<i64>,
    /// Monotonic milliseconds.
    expires_at_ms: Option<i64>,
    status: PairingStatus,
    /// Polls that came back without an activation.
    pub failed_poll_count: u32,
    /// Save attempts that failed for the activated identity.
    pub failed_save_count: u32,
    /// Identity received from the backend, held until the store accepts it.
    pending_identity: Option<DeviceIdentity>,
}

impl PairingSession {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            code: None,
            issued_at_ms: None,
            expires_at_ms: None,
            status: PairingStatus::AwaitingCode,
            failed_poll_count: 0,
            failed_save_count: 0,
            pending_identity: None,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn status(&self) -> PairingStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: PairingStatus) {
        self.status = status;
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_ref().map(|issued| issued.code.as_str())
    }

    pub fn access_token(&self) -> Option<&str> {
        self.code.as_ref().map(|issued| issued.access_token.as_str())
    }

    pub fn issued_at_ms(&self) -> Option<i64> {
        self.issued_at_ms
    }

    pub fn expires_at_ms(&self) -> Option<i64> {
        self.expires_at_ms
    }

    /// Attach the backend's code. Returns `false` if a code was already issued.
    pub(crate) fn attach_code(&mut self, issued: IssuedCode, now_ms: i64, lifetime_ms: i64) -> bool {
        if self.code.is_some() {
            return false;
        }
        self.issued_at_ms = Some(now_ms);
        self.expires_at_ms = Some(now_ms.saturating_add(lifetime_ms));
        self.code = Some(issued);
        true
    }

    /// A session without a code never expires; one with a code expires at
    /// `expires_at` regardless of poll outcome.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        match self.expires_at_ms {
            Some(expires_at) => now_ms >= expires_at,
            None => false,
        }
    }

    pub fn pending_identity(&self) -> Option<&DeviceIdentity> {
        self.pending_identity.as_ref()
    }

    pub(crate) fn hold_identity(&mut self, identity: DeviceIdentity) {
        self.pending_identity = Some(identity);
    }
}
