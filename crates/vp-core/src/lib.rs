//! # vp-core
//!
//! Core domain models and pairing logic for voxpair.
//!
//! This crate contains pure business logic without any infrastructure dependencies.
//! Network, storage and speech live behind the traits in [`ports`].

pub mod device;
pub mod ids;
pub mod pairing;
pub mod ports;
pub mod settings;

// Re-export commonly used types at the crate root
pub use device::DeviceIdentity;
pub use ids::SessionId;
pub use pairing::{
    PairingAction, PairingErrorKind, PairingEvent, PairingSession, PairingStateMachine,
    PairingStatus,
};
pub use settings::model::Settings;
