use std::time::Duration;

use crate::domain::Phase;

/// Automatic network calls the orchestrator may schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProgressAction {
    AutoProgressNight,
    AiSpeakSequential,
    AiVote,
    AutoProgressVoting,
}

impl ProgressAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressAction::AutoProgressNight => "auto_progress_night",
            ProgressAction::AiSpeakSequential => "ai_speak_sequential",
            ProgressAction::AiVote => "ai_vote",
            ProgressAction::AutoProgressVoting => "auto_progress_voting",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledAction {
    pub action: ProgressAction,
    /// Total delay before the action fires, settle delay included.
    pub delay: Duration,
}

/// Why `observe` scheduled nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The phase has no automatic progression (waiting, introduction, unknown).
    NoAutomaticAction,
    /// This action was already scheduled for the same round and turn.
    AlreadyTriggered,
    /// The local player's vote is still being processed.
    VoteInFlight,
    /// `gameOver` was observed; the orchestrator tore itself down.
    SessionEnded,
    /// The orchestrator was torn down before this call.
    TornDown,
}

/// What a single `observe` call decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionReport {
    pub phase: Phase,
    pub turn: u32,
    pub phase_changed: bool,
    pub scheduled: Option<ScheduledAction>,
    pub skipped: Option<SkipReason>,
    pub session_ended: bool,
}

impl TransitionReport {
    pub fn scheduled_action(&self) -> Option<ProgressAction> {
        self.scheduled.map(|s| s.action)
    }
}

/// Accepted vote, with the delay until the vote is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteOutcome {
    pub voter: String,
    pub target: String,
    pub follow_up_in: Duration,
}
