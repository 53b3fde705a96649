//! Turns pairing notification intents into speech, display and bus events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};
use vp_core::pairing::{spell_code, PairingBusEvent, PairingNotification};
use vp_core::ports::{DisplayContent, NotifierPort};

/// Dialog keys understood by the speech layer.
pub mod dialogs {
    pub const NOT_PAIRED: &str = "pairing.not.paired";
    pub const PAIRED: &str = "pairing.paired";
    pub const CODE: &str = "pairing.code";
    pub const WAIT_FOR_STARTUP: &str = "wait.for.startup";
    pub const CONNECTION_ERROR: &str = "connection.error";
    pub const RESTARTING: &str = "unexpected.error.restarting";
}

/// Presentation side of pairing.
///
/// Notifier failures never reach the state machine; they are logged here.
pub struct NotificationPresenter {
    notifier: Arc<dyn NotifierPort>,
    /// Whether the rest of the device has finished starting up.
    system_ready: AtomicBool,
}

impl NotificationPresenter {
    pub fn new(notifier: Arc<dyn NotifierPort>) -> Self {
        Self {
            notifier,
            system_ready: AtomicBool::new(true),
        }
    }

    pub fn set_system_ready(&self, ready: bool) {
        self.system_ready.store(ready, Ordering::SeqCst);
    }

    pub fn is_system_ready(&self) -> bool {
        self.system_ready.load(Ordering::SeqCst)
    }

    pub async fn present(&self, notification: &PairingNotification) {
        match notification {
            PairingNotification::NotPaired => self.speak(dialogs::NOT_PAIRED, json!({})).await,
            PairingNotification::AlreadyPaired => self.speak(dialogs::PAIRED, json!({})).await,
            PairingNotification::PresentCode { code, repeat } => {
                debug!(code = %code, repeat, "presenting pairing code");
                self.display(DisplayContent::Text(code.clone())).await;
                self.speak(dialogs::CODE, json!({ "code": spell_code(code) }))
                    .await;
            }
            PairingNotification::Paired => {
                self.display(DisplayContent::Clear).await;
                let dialog = if self.is_system_ready() {
                    dialogs::PAIRED
                } else {
                    dialogs::WAIT_FOR_STARTUP
                };
                self.speak(dialog, json!({})).await;
            }
            PairingNotification::ConnectionError => {
                self.display(DisplayContent::Clear).await;
                self.speak(dialogs::CONNECTION_ERROR, json!({})).await;
            }
            PairingNotification::RestartingAfterError => {
                self.display(DisplayContent::Clear).await;
                self.speak(dialogs::RESTARTING, json!({})).await;
            }
        }
    }

    /// Cut off code narration if it is still playing.
    pub async fn stop_narration(&self) {
        if !self.notifier.is_speaking().await {
            return;
        }
        if let Err(err) = self.notifier.stop_speaking().await {
            warn!(error = %err, "failed to stop speech");
        }
    }

    pub async fn emit(&self, event: &PairingBusEvent) {
        let name = event.name();
        if let Err(err) = self.notifier.emit_event(name, event.payload()).await {
            warn!(event = name, error = %err, "failed to emit bus event");
        }
    }

    async fn speak(&self, dialog: &str, data: Value) {
        if let Err(err) = self.notifier.speak(dialog, data).await {
            warn!(dialog, error = %err, "failed to speak dialog");
        }
    }

    async fn display(&self, content: DisplayContent) {
        if let Err(err) = self.notifier.display(content).await {
            warn!(error = %err, "failed to update display");
        }
    }
}
