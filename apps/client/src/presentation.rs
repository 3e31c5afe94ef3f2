//! Output side of the client: the sink trait and the transcript de-duplicator.

use std::collections::HashSet;
use std::io::Write;

use parking_lot::Mutex;

use crate::domain::{ChatMessage, MessageKind};

/// Consumer of everything the client wants shown to the user.
///
/// The orchestrator and session never format output themselves; they hand
/// values to a sink.
pub trait PresentationSink: Send + Sync {
    fn render(&self, message: &ChatMessage);

    /// Gate the input box; `hint` is shown as its placeholder.
    fn set_input_enabled(&self, enabled: bool, hint: &str);

    /// A speaker is about to say something.
    fn show_typing(&self, _sender: &str) {}
}

/// Line-oriented sink for the terminal binary.
#[derive(Debug, Default)]
pub struct TerminalSink {
    input_enabled: Mutex<Option<bool>>,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn write_line(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{line}");
    }
}

impl PresentationSink for TerminalSink {
    fn render(&self, message: &ChatMessage) {
        let line = match (message.kind, message.sender.as_deref()) {
            (MessageKind::System, _) => format!("[system] {}", message.content),
            (MessageKind::Moderator, _) => format!("[moderator] {}", message.content),
            (_, Some(sender)) => format!("{sender}: {}", message.content),
            (_, None) => message.content.clone(),
        };
        self.write_line(&line);
    }

    fn set_input_enabled(&self, enabled: bool, hint: &str) {
        let mut last = self.input_enabled.lock();
        if *last == Some(enabled) {
            return;
        }
        *last = Some(enabled);
        if enabled {
            self.write_line(&format!("> {hint}"));
        } else {
            self.write_line(&format!("(input paused: {hint})"));
        }
    }

    fn show_typing(&self, sender: &str) {
        self.write_line(&format!("{sender} is typing..."));
    }
}

/// Tracks which transcript lines the user has already seen.
///
/// Lines reach the sink from three places: paced AI speech, the local echo
/// of the player's own input, and the polled server transcript. A line is
/// identified by (sender, content, timestamp) so each is shown once.
#[derive(Debug, Default)]
pub struct Transcript {
    seen: Mutex<HashSet<(Option<String>, String, String)>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `message` unless an identical line was already shown.
    ///
    /// Returns whether the message was rendered.
    pub fn show(&self, sink: &dyn PresentationSink, message: &ChatMessage) -> bool {
        let key = (
            message.sender.clone(),
            message.content.clone(),
            message.timestamp.clone(),
        );
        if !self.seen.lock().insert(key) {
            return false;
        }
        sink.render(message);
        true
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }

    pub fn clear(&self) {
        self.seen.lock().clear();
    }
}
