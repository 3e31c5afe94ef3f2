use std::collections::{BTreeMap, HashSet};

use tokio_util::sync::CancellationToken;

use super::report::ProgressAction;
use crate::domain::{GameStateSnapshot, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

/// What a pending timer will do when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Progress(ProgressAction),
    /// Vote follow-up started by the local player's own vote.
    UserVoteFollowUp,
    /// Typing indicators, paced lines and other presentation steps.
    Pacing(&'static str),
}

#[derive(Debug, Clone)]
pub struct PendingTimer {
    pub kind: TimerKind,
    pub(crate) token: CancellationToken,
}

/// Identifies one progression action for one turn of one round.
///
/// The server restarts `turn` at 1 every night, so turns alone
/// cannot tell two rounds apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ProgressKey {
    pub round: u32,
    pub action: ProgressAction,
    pub turn: u32,
}

/// Guard flags and bookkeeping owned exclusively by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorState {
    pub last_observed_phase: Option<Phase>,
    /// Day turn for which AI speech was last scheduled in the current round.
    pub last_ai_speech_turn: Option<u32>,
    pub voting_in_flight: bool,
    pub pending_timers: BTreeMap<TimerId, PendingTimer>,
    /// Incremented each time a night begins.
    pub round: u32,
    pub(crate) claimed: HashSet<ProgressKey>,
    /// AI votes that completed and now wait on vote resolution.
    pub(crate) ai_votes_cast: HashSet<ProgressKey>,
    pub(crate) current: Option<GameStateSnapshot>,
    pub(crate) next_timer_id: u64,
    pub(crate) torn_down: bool,
}

impl OrchestratorState {
    /// Start a new round: per-round guards no longer apply.
    pub(crate) fn begin_round(&mut self) {
        self.round += 1;
        self.last_ai_speech_turn = None;
        let round = self.round;
        self.claimed.retain(|key| key.round == round);
        self.ai_votes_cast.retain(|key| key.round == round);
    }

    /// Claim `action` for `turn` in the current round. Returns false if already claimed.
    pub(crate) fn claim(&mut self, action: ProgressAction, turn: u32) -> bool {
        self.claimed.insert(ProgressKey {
            round: self.round,
            action,
            turn,
        })
    }

    /// Release a claim after a failed action so the next poll may retry it.
    pub(crate) fn release(&mut self, key: ProgressKey) {
        self.claimed.remove(&key);
    }

    pub(crate) fn key(&self, action: ProgressAction, turn: u32) -> ProgressKey {
        ProgressKey {
            round: self.round,
            action,
            turn,
        }
    }

    /// Whether `action` was already claimed for `turn` in the current round.
    pub fn is_claimed(&self, action: ProgressAction, turn: u32) -> bool {
        self.claimed.contains(&self.key(action, turn))
    }

    /// Whether the AI votes for `turn` are in but nothing will resolve the vote.
    ///
    /// True after a failed resolution: its claim was released and no
    /// follow-up timer from either chain is still pending.
    pub(crate) fn resolution_stalled(&self, turn: u32) -> bool {
        self.ai_votes_cast
            .contains(&self.key(ProgressAction::AiVote, turn))
            && !self.is_claimed(ProgressAction::AutoProgressVoting, turn)
            && !self.pending_timers.values().any(|timer| {
                matches!(
                    timer.kind,
                    TimerKind::Progress(ProgressAction::AutoProgressVoting)
                        | TimerKind::UserVoteFollowUp
                )
            })
    }

    pub(crate) fn next_timer_id(&mut self) -> TimerId {
        self.next_timer_id += 1;
        TimerId(self.next_timer_id)
    }

    pub fn current_snapshot(&self) -> Option<&GameStateSnapshot> {
        self.current.as_ref()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}
