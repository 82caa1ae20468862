use std::sync::Mutex;

use tracing::info;

/// Blocking user notice, the console's equivalent of `alert()`
pub trait Notifier {
    fn alert(&self, message: &str);
}

/// Prints notices on stderr for command-line use
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn alert(&self, message: &str) {
        info!("alert: {message}");
        eprintln!("{message}");
    }
}

/// Keeps every notice it receives, in order
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}
