mod tracing_notifier;

pub use tracing_notifier::{dialog_text, TracingNotifier};
