//! Dependency wiring: concrete adapters plugged into the pairing orchestrator.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use vp_app::{PairingConfig, PairingOrchestrator};
use vp_core::ports::CredentialStorePort;
use vp_core::{DeviceIdentity, Settings};
use vp_infra::{
    default_identity_path, FileCredentialStore, HttpBackendConfig, HttpDeviceBackend,
    MonotonicClock, TracingNotifier,
};

/// Everything the process needs to run pairing.
pub struct PairingRuntime {
    pub orchestrator: PairingOrchestrator,
    pub credentials: Arc<FileCredentialStore>,
}

impl PairingRuntime {
    /// Stored identity, treating an unreadable file as not paired.
    pub fn stored_identity(&self) -> Option<DeviceIdentity> {
        match self.credentials.load() {
            Ok(identity) => identity,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read stored identity");
                None
            }
        }
    }
}

fn identity_path(settings: &Settings) -> anyhow::Result<PathBuf> {
    match &settings.storage.identity_path {
        Some(path) => Ok(path.clone()),
        None => default_identity_path().context("no data directory for the identity file"),
    }
}

/// Build the orchestrator with the HTTP backend, file credential store,
/// log-backed notifier and monotonic clock.
pub fn build_runtime(settings: &Settings) -> anyhow::Result<PairingRuntime> {
    let backend = HttpDeviceBackend::new(HttpBackendConfig::from(&settings.backend))
        .context("Failed to build pairing backend client")?;
    let credentials = Arc::new(FileCredentialStore::new(identity_path(settings)?));

    info!(
        backend = %settings.backend.url,
        identity = %credentials.path().display(),
        "pairing runtime wired"
    );

    let orchestrator = PairingOrchestrator::new(
        PairingConfig::from_settings(settings),
        Arc::new(backend),
        credentials.clone(),
        Arc::new(TracingNotifier::new()),
        Arc::new(MonotonicClock::new()),
    );

    Ok(PairingRuntime {
        orchestrator,
        credentials,
    })
}
