//! # vp-app
//!
//! Application layer for voxpair. Drives the pure pairing state machine from
//! `vp-core` against real collaborators: the device backend, the credential
//! store, the notifier and a cancellable timer scheduler.

pub mod usecases;

pub use usecases::pairing::{
    ActivationPoller, NotificationPresenter, PairingConfig, PairingOrchestrator, PollOutcome,
    TaskScheduler,
};
