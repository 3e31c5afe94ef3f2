use std::fmt;

use serde::{Deserialize, Serialize};

/// Stage of the game as reported by the server.
///
/// Strings the client does not recognise decode to `Unknown`, which the
/// orchestrator treats as "no automatic action".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Waiting,
    Introduction,
    Night,
    Day,
    Voting,
    GameOver,
    #[serde(other)]
    Unknown,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Waiting => "waiting",
            Phase::Introduction => "introduction",
            Phase::Night => "night",
            Phase::Day => "day",
            Phase::Voting => "voting",
            Phase::GameOver => "gameOver",
            Phase::Unknown => "unknown",
        }
    }

    /// Free text or numeric vote input is only accepted in these phases.
    pub fn accepts_user_input(&self) -> bool {
        matches!(self, Phase::Day | Phase::Voting | Phase::Introduction)
    }

    /// Placeholder shown in the input box while this phase is active.
    pub fn input_hint(&self) -> &'static str {
        match self {
            Phase::Voting => "Enter the number of the player to vote for",
            Phase::Introduction => "Introduce yourself...",
            Phase::Day => "Join the discussion...",
            _ => "Waiting for input...",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Citizen,
    Mafia,
    #[serde(other)]
    Unknown,
}
