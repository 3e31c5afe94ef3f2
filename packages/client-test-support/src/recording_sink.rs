use mafia_client::{ChatMessage, MessageKind, PresentationSink};
use parking_lot::Mutex;

#[derive(Default)]
struct Recorded {
    rendered: Vec<ChatMessage>,
    input: Vec<(bool, String)>,
    typing: Vec<String>,
}

/// Presentation sink that remembers everything it was asked to show.
#[derive(Default)]
pub struct RecordingSink {
    recorded: Mutex<Recorded>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rendered(&self) -> Vec<ChatMessage> {
        self.recorded.lock().rendered.clone()
    }

    /// Contents of every rendered message, in order.
    pub fn contents(&self) -> Vec<String> {
        self.recorded
            .lock()
            .rendered
            .iter()
            .map(|m| m.content.clone())
            .collect()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.recorded
            .lock()
            .rendered
            .iter()
            .filter(|m| m.content.contains(needle))
            .count()
    }

    pub fn system_messages(&self) -> Vec<String> {
        self.recorded
            .lock()
            .rendered
            .iter()
            .filter(|m| m.kind == MessageKind::System)
            .map(|m| m.content.clone())
            .collect()
    }

    pub fn input_states(&self) -> Vec<(bool, String)> {
        self.recorded.lock().input.clone()
    }

    /// Most recent input gate, if any was set.
    pub fn input_enabled(&self) -> Option<bool> {
        self.recorded.lock().input.last().map(|(enabled, _)| *enabled)
    }

    pub fn typing(&self) -> Vec<String> {
        self.recorded.lock().typing.clone()
    }
}

impl PresentationSink for RecordingSink {
    fn render(&self, message: &ChatMessage) {
        self.recorded.lock().rendered.push(message.clone());
    }

    fn set_input_enabled(&self, enabled: bool, hint: &str) {
        self.recorded.lock().input.push((enabled, hint.to_string()));
    }

    fn show_typing(&self, sender: &str) {
        self.recorded.lock().typing.push(sender.to_string());
    }
}
