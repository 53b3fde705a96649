//! Device identity domain.

pub mod identity;

pub use identity::DeviceIdentity;
