//! Wire shapes of the game-state server's JSON API.

use serde::{Deserialize, Serialize};

use crate::domain::{ChatMessage, GameStateSnapshot, MessageKind, Phase, Role};

/// Body of `GET /game/state`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GameStateResponse {
    #[serde(flatten)]
    pub snapshot: GameStateSnapshot,
    #[serde(default)]
    pub chat_history: Vec<HistoryEntry>,
}

impl GameStateResponse {
    pub fn new(snapshot: GameStateSnapshot) -> Self {
        Self {
            snapshot,
            chat_history: Vec::new(),
        }
    }
}

/// One entry of the server-side transcript.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HistoryEntry {
    pub sender: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl HistoryEntry {
    /// Attribute the entry for rendering from the local player's point of view.
    pub fn to_message(&self, local_player: &str) -> ChatMessage {
        let kind = if self.sender == "moderator" || self.role.as_deref() == Some("moderator") {
            MessageKind::Moderator
        } else if self.sender == "system" {
            MessageKind::System
        } else if self.sender == local_player {
            MessageKind::Player
        } else {
            MessageKind::Ai
        };
        ChatMessage::new(
            kind,
            Some(self.sender.clone()),
            self.content.clone(),
            self.timestamp.clone(),
        )
    }
}

/// Result of `POST /game/auto-progress`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PhaseAdvance {
    pub phase: Phase,
    #[serde(default)]
    pub turn: u32,
    #[serde(default)]
    pub announcement: Option<String>,
}

/// A single AI utterance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChatLine {
    pub sender: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
}

impl ChatLine {
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage::new(
            MessageKind::Ai,
            Some(self.sender.clone()),
            self.content.clone(),
            self.timestamp.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VoteCast {
    pub voter: String,
    pub target: String,
}

/// Result of `POST /game/start`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StartedGame {
    pub phase: Phase,
    #[serde(default)]
    pub players: Vec<String>,
    #[serde(default)]
    pub roles: std::collections::BTreeMap<String, Role>,
}

/// Result of `POST /game/complete-introduction`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IntroductionCompleted {
    pub phase: Phase,
    #[serde(default)]
    pub announcement: Option<String>,
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingChat {
    pub sender: String,
    pub content: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Result of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct ChatReply {
    #[serde(default)]
    pub auto_progress: Option<PhaseAdvance>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StartGameRequest<'a> {
    pub player_name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct VoteRequest<'a> {
    pub voter: &'a str,
    pub target: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AiResponses {
    #[serde(default)]
    pub ai_responses: Vec<ChatLine>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AiIntroductions {
    #[serde(default)]
    pub ai_introductions: Vec<ChatLine>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AiVotes {
    #[serde(default)]
    pub ai_votes: Vec<VoteCast>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UsageStatsBody {
    #[serde(default)]
    pub usage_stats: serde_json::Value,
}
