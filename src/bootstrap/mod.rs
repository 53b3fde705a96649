pub mod cli;
pub mod config;
pub mod run;
pub mod tracing;
pub mod wiring;

pub use cli::Cli;
pub use config::{load_settings, resolve_config_path};
pub use run::run;
pub use wiring::{build_runtime, PairingRuntime};
