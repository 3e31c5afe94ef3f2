//! Phase orchestration.
//!
//! The server decides every transition; the orchestrator only reacts to the
//! phase in each polled snapshot and schedules at most one progression
//! action per phase entry:
//!
//! - `night`  -> `AutoProgressNight` after the action delay
//! - `day`    -> `AiSpeakSequential` once per day turn
//! - `voting` -> `AiVote`, then `AutoProgressVoting` after the follow-up delay
//!
//! A phase change adds the settle delay in front of the action. Guards are
//! marked in the same critical section that schedules the action, so
//! overlapping polls cannot double-schedule. A failed action releases its
//! guard and the next poll retries it.

pub mod report;
pub mod state;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use report::{ProgressAction, ScheduledAction, SkipReason, TransitionReport, VoteOutcome};
pub use state::{OrchestratorState, PendingTimer, TimerId, TimerKind};

use self::state::ProgressKey;
use crate::api::{ActionInvoker, ChatLine};
use crate::domain::{GameStateSnapshot, Phase};
use crate::error::{ClientError, VoteError};
use crate::presentation::{PresentationSink, Transcript};
use crate::scheduler::{Pacing, Scheduler, TokioScheduler};

struct Inner {
    local_player: String,
    state: Mutex<OrchestratorState>,
    invoker: Arc<dyn ActionInvoker>,
    sink: Arc<dyn PresentationSink>,
    transcript: Arc<Transcript>,
    scheduler: Arc<dyn Scheduler>,
    pacing: Pacing,
    refresh: Arc<Notify>,
    session_token: CancellationToken,
}

impl Inner {
    fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    /// Re-open the input box according to the last observed phase.
    fn restore_input(&self) {
        let phase = self
            .state
            .lock()
            .current
            .as_ref()
            .map_or(Phase::Waiting, |s| s.phase);
        self.sink
            .set_input_enabled(phase.accepts_user_input(), phase.input_hint());
    }
}

/// Builder for [`PhaseOrchestrator`].
pub struct OrchestratorBuilder {
    local_player: String,
    invoker: Arc<dyn ActionInvoker>,
    sink: Arc<dyn PresentationSink>,
    scheduler: Option<Arc<dyn Scheduler>>,
    pacing: Pacing,
    transcript: Option<Arc<Transcript>>,
    refresh: Option<Arc<Notify>>,
}

impl OrchestratorBuilder {
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn transcript(mut self, transcript: Arc<Transcript>) -> Self {
        self.transcript = Some(transcript);
        self
    }

    /// Signal notified whenever a completed action makes a fresh snapshot worthwhile.
    pub fn refresh_signal(mut self, refresh: Arc<Notify>) -> Self {
        self.refresh = Some(refresh);
        self
    }

    pub fn build(self) -> PhaseOrchestrator {
        PhaseOrchestrator {
            inner: Arc::new(Inner {
                local_player: self.local_player,
                state: Mutex::new(OrchestratorState::default()),
                invoker: self.invoker,
                sink: self.sink,
                transcript: self.transcript.unwrap_or_default(),
                scheduler: self
                    .scheduler
                    .unwrap_or_else(|| Arc::new(TokioScheduler)),
                pacing: self.pacing,
                refresh: self.refresh.unwrap_or_default(),
                session_token: CancellationToken::new(),
            }),
        }
    }
}

/// Drives progression actions for one game session.
///
/// Cheap to clone; all clones share the same state. Construct one per
/// session and call [`PhaseOrchestrator::teardown`] when the session ends.
#[derive(Clone)]
pub struct PhaseOrchestrator {
    inner: Arc<Inner>,
}

impl PhaseOrchestrator {
    pub fn builder(
        local_player: impl Into<String>,
        invoker: Arc<dyn ActionInvoker>,
        sink: Arc<dyn PresentationSink>,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder {
            local_player: local_player.into(),
            invoker,
            sink,
            scheduler: None,
            pacing: Pacing::default(),
            transcript: None,
            refresh: None,
        }
    }

    pub fn local_player(&self) -> &str {
        &self.inner.local_player
    }

    pub fn pacing(&self) -> Pacing {
        self.inner.pacing
    }

    /// React to a freshly fetched snapshot.
    ///
    /// Must be called with the most recent snapshot. Identical snapshots are
    /// not deduplicated here; the guards make repeated calls idempotent per
    /// (round, phase, turn).
    pub fn observe(&self, snapshot: &GameStateSnapshot) -> TransitionReport {
        let inner = &self.inner;
        let pacing = inner.pacing;
        let phase = snapshot.phase;
        let turn = snapshot.turn;

        let mut state = inner.state.lock();
        let mut report = TransitionReport {
            phase,
            turn,
            phase_changed: false,
            scheduled: None,
            skipped: None,
            session_ended: false,
        };
        if state.torn_down {
            report.skipped = Some(SkipReason::TornDown);
            return report;
        }

        report.phase_changed = state.last_observed_phase.is_some_and(|last| last != phase);
        if phase == Phase::Night && state.last_observed_phase != Some(Phase::Night) {
            state.begin_round();
            debug!(round = state.round, "Night observed, new round");
        }
        state.last_observed_phase = Some(phase);
        state.current = Some(snapshot.clone());

        let decision = match phase {
            Phase::Night => {
                if state.claim(ProgressAction::AutoProgressNight, turn) {
                    Ok(ProgressAction::AutoProgressNight)
                } else {
                    Err(SkipReason::AlreadyTriggered)
                }
            }
            Phase::Day => {
                if state.last_ai_speech_turn.is_none_or(|last| turn > last) {
                    Ok(ProgressAction::AiSpeakSequential)
                } else {
                    Err(SkipReason::AlreadyTriggered)
                }
            }
            Phase::Voting => {
                if state.voting_in_flight {
                    Err(SkipReason::VoteInFlight)
                } else if state.claim(ProgressAction::AiVote, turn) {
                    Ok(ProgressAction::AiVote)
                } else if state.resolution_stalled(turn) {
                    Ok(ProgressAction::AutoProgressVoting)
                } else {
                    Err(SkipReason::AlreadyTriggered)
                }
            }
            Phase::GameOver => Err(SkipReason::SessionEnded),
            Phase::Waiting | Phase::Introduction | Phase::Unknown => {
                Err(SkipReason::NoAutomaticAction)
            }
        };

        match decision {
            Ok(action) => {
                let settle = if report.phase_changed {
                    pacing.phase_settle
                } else {
                    Duration::ZERO
                };
                let delay = match action {
                    // AI votes are already in; resolution claims its own guard when it fires.
                    ProgressAction::AutoProgressVoting => pacing.ai_vote_follow_up,
                    _ => settle + pacing.action_delay,
                };
                let previous_speech_turn = if action == ProgressAction::AiSpeakSequential {
                    state.last_ai_speech_turn.replace(turn)
                } else {
                    None
                };
                let key = state.key(action, turn);
                let task_inner = inner.clone();
                track_timer(
                    inner,
                    &mut state,
                    TimerKind::Progress(action),
                    delay,
                    run_progress(task_inner, key, previous_speech_turn),
                );
                info!(
                    action = action.as_str(),
                    %phase,
                    turn,
                    round = state.round,
                    delay_ms = delay.as_millis() as u64,
                    phase_changed = report.phase_changed,
                    "Progression action scheduled"
                );
                report.scheduled = Some(ScheduledAction { action, delay });
            }
            Err(SkipReason::SessionEnded) => {
                info!(turn, "Game over observed, ending session");
                teardown_locked(inner, &mut state);
                report.skipped = Some(SkipReason::SessionEnded);
                report.session_ended = true;
            }
            Err(reason) => {
                debug!(%phase, turn, reason = ?reason, "No progression action");
                report.skipped = Some(reason);
            }
        }
        report
    }

    /// Submit the local player's vote against `target`.
    ///
    /// Sets the in-flight guard before calling the server. On success the
    /// vote is resolved after the user-vote follow-up delay; the guard is
    /// cleared when that timer fires or when the call fails.
    pub async fn submit_vote(&self, target: &str) -> Result<VoteOutcome, VoteError> {
        let inner = &self.inner;
        let local = inner.local_player.as_str();
        let (round, turn) = {
            let mut state = inner.state.lock();
            if state.torn_down {
                return Err(VoteError::invalid(target, "the game has ended"));
            }
            if state.voting_in_flight {
                debug!(voted_for = target, "Vote rejected, another vote is in flight");
                return Err(VoteError::AlreadyVoting);
            }
            let snapshot = state
                .current
                .as_ref()
                .ok_or_else(|| VoteError::invalid(target, "no game state observed yet"))?;
            if !snapshot.has_player(target) {
                return Err(VoteError::invalid(target, "not a player in this game"));
            }
            if target == local {
                return Err(VoteError::invalid(target, "cannot vote for yourself"));
            }
            if snapshot.is_eliminated(target) {
                return Err(VoteError::invalid(target, "player already eliminated"));
            }
            let turn = snapshot.turn;
            state.voting_in_flight = true;
            (state.round, turn)
        };

        inner.sink.set_input_enabled(false, "Processing vote...");
        info!(voter = local, voted_for = target, turn, "Submitting vote");

        let result = match inner.invoker.submit_vote(local, target).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ClientError::rejected("submit_vote", "vote was not accepted")),
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            warn!(voter = local, voted_for = target, error = %err, code = err.code(), "Vote submission failed");
            inner.state.lock().voting_in_flight = false;
            inner.restore_input();
            return Err(err.into());
        }

        let follow_up_in = inner.pacing.user_vote_follow_up;
        {
            let mut state = inner.state.lock();
            if !state.torn_down {
                let task_inner = inner.clone();
                track_timer(
                    inner,
                    &mut state,
                    TimerKind::UserVoteFollowUp,
                    follow_up_in,
                    async move {
                        task_inner.state.lock().voting_in_flight = false;
                        task_inner.restore_input();
                        resolve_voting(task_inner, round, turn).await;
                    },
                );
            }
        }
        inner.request_refresh();

        Ok(VoteOutcome {
            voter: local.to_string(),
            target: target.to_string(),
            follow_up_in,
        })
    }

    /// Whether free text or numeric vote input is accepted for `snapshot`.
    pub fn can_accept_user_input(&self, snapshot: &GameStateSnapshot) -> bool {
        snapshot.phase.accepts_user_input()
    }

    /// Show `lines` one speaker at a time, then run `then`.
    ///
    /// Each speaker shows as typing for the typing delay before the line
    /// appears, with the speaker gap between consecutive speakers.
    pub fn present_lines<F>(&self, lines: Vec<ChatLine>, then: F)
    where
        F: FnOnce() + Send + 'static,
    {
        present_lines(&self.inner, lines, then);
    }

    /// Run `task` after `delay` as a tracked, cancellable timer.
    ///
    /// Returns `None` once the orchestrator has been torn down.
    pub fn schedule<F>(&self, delay: Duration, label: &'static str, task: F) -> Option<TimerId>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.inner.state.lock();
        if state.torn_down {
            return None;
        }
        Some(track_timer(
            &self.inner,
            &mut state,
            TimerKind::Pacing(label),
            delay,
            task,
        ))
    }

    pub fn request_refresh(&self) {
        self.inner.request_refresh();
    }

    /// Cancel every pending timer. Idempotent.
    pub fn teardown(&self) {
        let mut state = self.inner.state.lock();
        teardown_locked(&self.inner, &mut state);
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.state.lock().torn_down
    }

    /// Copy of the current guard state.
    pub fn state(&self) -> OrchestratorState {
        self.inner.state.lock().clone()
    }

    pub fn current_snapshot(&self) -> Option<GameStateSnapshot> {
        self.inner.state.lock().current.clone()
    }

    pub fn pending_timer_count(&self) -> usize {
        self.inner.state.lock().pending_timers.len()
    }

    pub fn is_voting_in_flight(&self) -> bool {
        self.inner.state.lock().voting_in_flight
    }
}

fn teardown_locked(inner: &Inner, state: &mut OrchestratorState) {
    if state.torn_down {
        return;
    }
    let cancelled = state.pending_timers.len();
    inner.session_token.cancel();
    state.pending_timers.clear();
    state.voting_in_flight = false;
    state.torn_down = true;
    info!(cancelled_timers = cancelled, "Orchestrator torn down");
}

/// Register `fut` with the scheduler and track it in `pending_timers` until it fires.
fn track_timer<F>(
    inner: &Arc<Inner>,
    state: &mut OrchestratorState,
    kind: TimerKind,
    delay: Duration,
    fut: F,
) -> TimerId
where
    F: Future<Output = ()> + Send + 'static,
{
    let id = state.next_timer_id();
    let token = inner.session_token.child_token();
    state.pending_timers.insert(
        id,
        PendingTimer {
            kind,
            token: token.clone(),
        },
    );
    let owner = inner.clone();
    let task = async move {
        owner.state.lock().pending_timers.remove(&id);
        fut.await;
    }
    .boxed();
    inner.scheduler.schedule(delay, token, task);
    id
}

fn present_lines<F>(inner: &Arc<Inner>, lines: Vec<ChatLine>, then: F)
where
    F: FnOnce() + Send + 'static,
{
    let pacing = inner.pacing;
    let mut state = inner.state.lock();
    if state.torn_down {
        return;
    }
    let count = lines.len();
    for (index, line) in lines.into_iter().enumerate() {
        let start = pacing.speaker_offset(index);

        let typing_inner = inner.clone();
        let sender = line.sender.clone();
        track_timer(
            inner,
            &mut state,
            TimerKind::Pacing("typing"),
            start,
            async move { typing_inner.sink.show_typing(&sender) },
        );

        let line_inner = inner.clone();
        track_timer(
            inner,
            &mut state,
            TimerKind::Pacing("line"),
            start + pacing.typing,
            async move {
                line_inner
                    .transcript
                    .show(line_inner.sink.as_ref(), &line.to_message());
            },
        );
    }
    let done_at = match count {
        0 => Duration::ZERO,
        n => pacing.speaker_offset(n - 1) + pacing.typing,
    };
    track_timer(
        inner,
        &mut state,
        TimerKind::Pacing("lines_done"),
        done_at,
        async move { then() },
    );
}

async fn run_progress(inner: Arc<Inner>, key: ProgressKey, previous_speech_turn: Option<u32>) {
    let ProgressKey { round, action, turn } = key;
    match action {
        ProgressAction::AutoProgressNight => match inner.invoker.auto_progress().await {
            Ok(advance) => {
                info!(
                    round,
                    turn,
                    next_phase = %advance.phase,
                    next_turn = advance.turn,
                    "Night auto-progress completed"
                );
                inner.request_refresh();
            }
            Err(err) => {
                warn!(round, turn, error = %err, code = err.code(), "Night auto-progress failed, guard released");
                inner.state.lock().release(key);
            }
        },
        ProgressAction::AiSpeakSequential => match inner.invoker.ai_speak_sequential().await {
            Ok(lines) => {
                info!(round, turn, speakers = lines.len(), "AI speech received");
                let done_inner = inner.clone();
                present_lines(&inner, lines, move || done_inner.request_refresh());
            }
            Err(err) => {
                warn!(round, turn, error = %err, code = err.code(), "AI speech failed, guard released");
                let mut state = inner.state.lock();
                if state.round == round && state.last_ai_speech_turn == Some(turn) {
                    state.last_ai_speech_turn = previous_speech_turn;
                }
            }
        },
        ProgressAction::AiVote => match inner.invoker.ai_vote().await {
            Ok(votes) => {
                info!(round, turn, votes = votes.len(), "AI votes cast");
                for vote in &votes {
                    debug!(voter = %vote.voter, voted_for = %vote.target, "AI vote");
                }
                inner.request_refresh();
                let follow_up = inner.pacing.ai_vote_follow_up;
                let mut state = inner.state.lock();
                state.ai_votes_cast.insert(key);
                if !state.torn_down {
                    let task_inner = inner.clone();
                    track_timer(
                        &inner,
                        &mut state,
                        TimerKind::Progress(ProgressAction::AutoProgressVoting),
                        follow_up,
                        resolve_voting(task_inner, round, turn),
                    );
                }
            }
            Err(err) => {
                warn!(round, turn, error = %err, code = err.code(), "AI vote failed, guard released");
                inner.state.lock().release(key);
            }
        },
        ProgressAction::AutoProgressVoting => resolve_voting(inner, round, turn).await,
    }
}

/// Resolve the vote for (round, turn) at most once, whichever chain gets here first.
async fn resolve_voting(inner: Arc<Inner>, round: u32, turn: u32) {
    let key = ProgressKey {
        round,
        action: ProgressAction::AutoProgressVoting,
        turn,
    };
    {
        let mut state = inner.state.lock();
        if state.torn_down {
            return;
        }
        if !state.claimed.insert(key) {
            debug!(round, turn, "Vote already resolved for this turn");
            return;
        }
    }
    match inner.invoker.auto_progress().await {
        Ok(advance) => {
            info!(
                round,
                turn,
                next_phase = %advance.phase,
                next_turn = advance.turn,
                "Voting auto-progress completed"
            );
            inner.request_refresh();
        }
        Err(err) => {
            warn!(round, turn, error = %err, code = err.code(), "Voting auto-progress failed, guard released");
            inner.state.lock().release(key);
        }
    }
}
