pub mod backend;
pub mod credential;
pub mod notifier;
pub mod time;

pub use backend::{HttpBackendConfig, HttpDeviceBackend};
pub use credential::{default_identity_path, FileCredentialStore};
pub use notifier::TracingNotifier;
pub use time::MonotonicClock;
