//! Notification intents and bus events produced by the pairing flow.
//!
//! The state machine only says *what* the user should learn; turning that
//! into dialogs and display pages is the presenter's job.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Bus event names kept stable for existing listeners.
pub mod event_names {
    pub const DEVICE_PAIRED: &str = "device.paired";
    pub const DEVICE_NOT_PAIRED: &str = "device.not.paired";
    pub const MIC_UNMUTE: &str = "mic.unmute";
    pub const CONFIGURATION_UPDATED: &str = "configuration.updated";
}

/// What the user should be told.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairingNotification {
    /// The device has no identity yet.
    NotPaired,
    /// Pairing was requested but an identity is already stored.
    AlreadyPaired,
    /// Show and read out the pairing code.
    PresentCode { code: String, repeat: bool },
    /// Activation completed and the identity is saved.
    Paired,
    /// Code fetching gave up.
    ConnectionError,
    /// The session was aborted and a new one is on its way.
    RestartingAfterError,
}

/// Event published on the device bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairingBusEvent {
    Paired { uuid: String },
    NotPaired,
    MicUnmute,
    ConfigurationUpdated,
}

impl PairingBusEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PairingBusEvent::Paired { .. } => event_names::DEVICE_PAIRED,
            PairingBusEvent::NotPaired => event_names::DEVICE_NOT_PAIRED,
            PairingBusEvent::MicUnmute => event_names::MIC_UNMUTE,
            PairingBusEvent::ConfigurationUpdated => event_names::CONFIGURATION_UPDATED,
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            PairingBusEvent::Paired { uuid } => json!({ "uuid": uuid }),
            PairingBusEvent::NotPaired => json!({ "quiet": true }),
            PairingBusEvent::MicUnmute | PairingBusEvent::ConfigurationUpdated => json!({}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_event_names_are_stable() {
        assert_eq!(
            PairingBusEvent::Paired {
                uuid: "u1".to_string()
            }
            .name(),
            "device.paired"
        );
        assert_eq!(PairingBusEvent::NotPaired.name(), "device.not.paired");
        assert_eq!(PairingBusEvent::MicUnmute.name(), "mic.unmute");
        assert_eq!(
            PairingBusEvent::ConfigurationUpdated.name(),
            "configuration.updated"
        );
    }

    #[test]
    fn paired_payload_carries_uuid_only() {
        let payload = PairingBusEvent::Paired {
            uuid: "u1".to_string(),
        }
        .payload();
        assert_eq!(payload, json!({ "uuid": "u1" }));
    }
}
