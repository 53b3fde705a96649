//! Device pairing use cases.

pub mod orchestrator;
pub mod poller;
pub mod presenter;
pub mod scheduler;

pub use orchestrator::{PairingConfig, PairingOrchestrator};
pub use poller::{ActivationPoller, PollOutcome};
pub use presenter::{dialogs, NotificationPresenter};
pub use scheduler::TaskScheduler;
