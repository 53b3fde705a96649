//! Port interfaces for the pairing flow
//!
//! Ports define the contract between the pairing logic and the outside
//! world: the device backend, the credential store, the user-facing
//! notifier and the clock. Adapters live in `vp-infra`; tests provide
//! in-memory fakes.

mod backend;
mod clock;
mod credential_store;
mod notifier;

pub use backend::{BackendError, DeviceBackendPort};
pub use clock::ClockPort;
pub use credential_store::{CredentialStoreError, CredentialStorePort};
pub use notifier::{DisplayContent, NotifierPort};

#[cfg(test)]
pub use credential_store::MockCredentialStore;
