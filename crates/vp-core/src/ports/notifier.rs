use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// What to put on the device display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayContent {
    /// Short text, e.g. the pairing code.
    Text(String),
    /// Return the display to its idle face.
    Clear,
}

/// User-facing output: speech, display and the device message bus.
///
/// Failures are reported but never fatal to pairing; callers log them.
#[async_trait]
pub trait NotifierPort: Send + Sync {
    /// Speak a dialog identified by its key, with template data.
    async fn speak(&self, dialog: &str, data: Value) -> Result<()>;

    async fn display(&self, content: DisplayContent) -> Result<()>;

    /// Publish an event on the device bus.
    async fn emit_event(&self, name: &str, payload: Value) -> Result<()>;

    /// Whether speech is currently playing.
    async fn is_speaking(&self) -> bool;

    /// Stop any speech currently playing.
    async fn stop_speaking(&self) -> Result<()>;
}
