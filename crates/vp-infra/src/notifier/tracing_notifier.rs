use async_trait::async_trait;
use serde_json::Value;
use tracing::info;
use vp_core::ports::{DisplayContent, NotifierPort};

/// English text for a dialog key, with `{field}` placeholders filled from `data`.
pub fn dialog_text(dialog: &str, data: &Value) -> String {
    let template = match dialog {
        "pairing.not.paired" => "This device is not paired with an account yet.",
        "pairing.paired" => "This device is now paired and ready to use.",
        "pairing.code" => {
            "To pair this device, enter the registration code {code} on the pairing website."
        }
        "wait.for.startup" => "Pairing complete. Please wait while startup finishes.",
        "connection.error" => "I could not reach the pairing service. Check the network connection.",
        "unexpected.error.restarting" => {
            "Something went wrong during pairing. Starting over with a new code."
        }
        other => return other.to_string(),
    };

    let mut text = template.to_string();
    if let Value::Object(fields) = data {
        for (key, value) in fields {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            text = text.replace(&format!("{{{key}}}"), &rendered);
        }
    }
    text
}

/// Headless notifier: speech, display and bus events go to the log.
///
/// Speech is a single log line, so nothing is ever still playing.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifierPort for TracingNotifier {
    async fn speak(&self, dialog: &str, data: Value) -> anyhow::Result<()> {
        info!(target: "voxpair::speech", dialog, "{}", dialog_text(dialog, &data));
        Ok(())
    }

    async fn display(&self, content: DisplayContent) -> anyhow::Result<()> {
        match content {
            DisplayContent::Text(text) => info!(target: "voxpair::display", text = %text, "display text"),
            DisplayContent::Clear => info!(target: "voxpair::display", "display cleared"),
        }
        Ok(())
    }

    async fn emit_event(&self, name: &str, payload: Value) -> anyhow::Result<()> {
        info!(target: "voxpair::bus", event = name, payload = %payload, "bus event");
        Ok(())
    }

    async fn is_speaking(&self) -> bool {
        false
    }

    async fn stop_speaking(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
