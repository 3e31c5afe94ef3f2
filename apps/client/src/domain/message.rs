use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Who a rendered line is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    System,
    Moderator,
    Player,
    Ai,
}

/// A line handed to the presentation sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    pub content: String,
    pub timestamp: String,
}

impl ChatMessage {
    pub fn new(
        kind: MessageKind,
        sender: Option<String>,
        content: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            sender,
            content: content.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Client-originated notice, stamped with the local clock.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageKind::System, None, content, now_timestamp())
    }

    pub fn player(sender: &str, content: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self::new(
            MessageKind::Player,
            Some(sender.to_string()),
            content,
            timestamp,
        )
    }
}

/// RFC 3339 timestamp of the current UTC time.
pub fn now_timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}
