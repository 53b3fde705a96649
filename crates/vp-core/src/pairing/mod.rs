//! Device-to-account pairing domain.

pub mod error;
pub mod notification;
pub mod phonetic;
pub mod retry;
pub mod session;
pub mod state_machine;

pub use error::PairingErrorKind;
pub use notification::{event_names, PairingBusEvent, PairingNotification};
pub use phonetic::spell_code;
pub use retry::{save_retry_decision, RetryDecision, RetryPolicy, RetryTracker};
pub use session::{IssuedCode, PairingSession, PairingStatus};
pub use state_machine::{
    PairingAction, PairingEvent, PairingPolicy, PairingStateMachine, RestartCause,
};
