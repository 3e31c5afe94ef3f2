//! One player's game session: connection, game start, introductions,
//! polling and input routing around the [`PhaseOrchestrator`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tokio::sync::{mpsc, Notify};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ActionInvoker, GameServer, LobbyApi, OutgoingChat, StartedGame, StateFetcher};
use crate::domain::{now_timestamp, ChatMessage, GameStateSnapshot, Phase};
use crate::error::{ClientError, InputError};
use crate::orchestrator::{PhaseOrchestrator, TransitionReport, VoteOutcome};
use crate::presentation::{PresentationSink, Transcript};
use crate::scheduler::{Pacing, Scheduler, TokioScheduler};
use crate::validation::validate_player_name;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// What a line of user input turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    /// Blank input.
    Ignored,
    /// Introduction accepted; completion follows after the pacing delay.
    Introduced,
    Voted(VoteOutcome),
    Chatted,
}

#[derive(Default)]
struct SessionState {
    connected: bool,
    player_name: Option<String>,
    orchestrator: Option<PhaseOrchestrator>,
    /// Input stays closed regardless of phase (AI introductions running,
    /// own introduction being completed).
    input_held: bool,
    ended: bool,
}

pub struct GameSession {
    fetcher: Arc<dyn StateFetcher>,
    invoker: Arc<dyn ActionInvoker>,
    lobby: Arc<dyn LobbyApi>,
    sink: Arc<dyn PresentationSink>,
    scheduler: Arc<dyn Scheduler>,
    pacing: Pacing,
    poll_interval: Duration,
    transcript: Arc<Transcript>,
    refresh: Arc<Notify>,
    state: Arc<Mutex<SessionState>>,
}

impl GameSession {
    pub fn new<S>(server: Arc<S>, sink: Arc<dyn PresentationSink>) -> Self
    where
        S: GameServer + 'static,
    {
        Self {
            fetcher: server.clone(),
            invoker: server.clone(),
            lobby: server,
            sink,
            scheduler: Arc::new(TokioScheduler),
            pacing: Pacing::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            transcript: Arc::new(Transcript::new()),
            refresh: Arc::new(Notify::new()),
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    pub fn is_ended(&self) -> bool {
        self.state.lock().ended
    }

    pub fn player_name(&self) -> Option<String> {
        self.state.lock().player_name.clone()
    }

    /// Orchestrator of the current game, if one was started.
    pub fn orchestrator(&self) -> Option<PhaseOrchestrator> {
        self.state.lock().orchestrator.clone()
    }

    pub fn transcript(&self) -> &Arc<Transcript> {
        &self.transcript
    }

    /// Signal notified whenever the orchestrator wants a fresh snapshot.
    pub fn refresh_signal(&self) -> Arc<Notify> {
        self.refresh.clone()
    }

    fn input_frozen(&self) -> bool {
        let state = self.state.lock();
        state.input_held || state.ended
    }

    fn notice(&self, content: impl Into<String>) {
        self.sink.render(&ChatMessage::system(content));
    }

    /// Check that the server is reachable.
    pub async fn connect(&self) -> Result<(), ClientError> {
        match self.lobby.check_connection().await {
            Ok(()) => {
                self.state.lock().connected = true;
                info!("Connected to game server");
                self.notice("Connected to the game server.");
                Ok(())
            }
            Err(err) => {
                self.state.lock().connected = false;
                warn!(error = %err, code = err.code(), "Game server unreachable");
                self.notice(format!("Could not reach the game server: {err}"));
                Err(err)
            }
        }
    }

    /// Start a new game as `name`, replacing any game in progress.
    pub async fn start(&self, name: &str) -> Result<StartedGame, InputError> {
        let name = validate_player_name(name)?;
        let previous = {
            let mut state = self.state.lock();
            if !state.connected {
                return Err(InputError::NotConnected);
            }
            state.orchestrator.take()
        };
        if let Some(previous) = previous {
            debug!("Tearing down previous game");
            previous.teardown();
        }

        let started = self.lobby.start_game(&name).await?;
        info!(player = %name, players = started.players.len(), phase = %started.phase, "Game started");

        self.transcript.clear();
        let orchestrator = PhaseOrchestrator::builder(
            name.clone(),
            self.invoker.clone(),
            self.sink.clone(),
        )
        .scheduler(self.scheduler.clone())
        .pacing(self.pacing)
        .transcript(self.transcript.clone())
        .refresh_signal(self.refresh.clone())
        .build();
        {
            let mut state = self.state.lock();
            state.player_name = Some(name);
            state.orchestrator = Some(orchestrator.clone());
            state.input_held = true;
            state.ended = false;
        }
        self.sink.set_input_enabled(false, "Waiting for introductions...");
        self.refresh().await;

        let lobby = self.lobby.clone();
        let sink = self.sink.clone();
        let state = self.state.clone();
        let presenter = orchestrator.clone();
        orchestrator.schedule(self.pacing.intro_kickoff, "intro_kickoff", async move {
            let lines = match lobby.ai_introduction_sequential().await {
                Ok(lines) => lines,
                Err(err) => {
                    warn!(error = %err, code = err.code(), "AI introductions failed");
                    Vec::new()
                }
            };
            info!(speakers = lines.len(), "Presenting AI introductions");
            let after = presenter.clone();
            presenter.present_lines(lines, move || {
                state.lock().input_held = false;
                sink.set_input_enabled(true, Phase::Introduction.input_hint());
                after.request_refresh();
            });
        });

        Ok(started)
    }

    /// Fetch the authoritative state, show new transcript lines and let the
    /// orchestrator react.
    ///
    /// A failed fetch is logged and yields `None`: no progression this tick.
    pub async fn refresh(&self) -> Option<TransitionReport> {
        let orchestrator = self.orchestrator()?;
        let response = match self.fetcher.fetch_state().await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, code = err.code(), "State fetch failed, skipping this tick");
                return None;
            }
        };

        let local = orchestrator.local_player();
        for entry in &response.chat_history {
            self.transcript
                .show(self.sink.as_ref(), &entry.to_message(local));
        }

        let report = orchestrator.observe(&response.snapshot);
        if report.session_ended {
            let mut state = self.state.lock();
            if !state.ended {
                state.ended = true;
                info!(turn = report.turn, "Session ended");
            }
            drop(state);
            self.sink.set_input_enabled(false, "The game is over");
        } else if !self.input_frozen() && !orchestrator.is_voting_in_flight() {
            let phase = report.phase;
            self.sink
                .set_input_enabled(phase.accepts_user_input(), phase.input_hint());
        }
        Some(report)
    }

    /// Route one line of user input according to the current phase.
    ///
    /// Rejections are also rendered as system messages.
    pub async fn handle_input(&self, text: &str) -> Result<InputOutcome, InputError> {
        let result = self.dispatch_input(text).await;
        if let Err(err) = &result {
            debug!(error = %err, "Input rejected");
            self.notice(err.to_string());
        }
        result
    }

    async fn dispatch_input(&self, text: &str) -> Result<InputOutcome, InputError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(InputOutcome::Ignored);
        }
        let (orchestrator, held) = {
            let state = self.state.lock();
            let orchestrator = state.orchestrator.clone().ok_or(InputError::NoSession)?;
            (orchestrator, state.input_held)
        };
        let snapshot = orchestrator
            .current_snapshot()
            .unwrap_or_else(|| GameStateSnapshot::new(Phase::Waiting, 0));
        if held || !orchestrator.can_accept_user_input(&snapshot) {
            return Err(InputError::NotYourTurn {
                phase: snapshot.phase,
            });
        }

        match snapshot.phase {
            Phase::Introduction => Ok(self.introduce(&orchestrator, text)),
            Phase::Voting => {
                let outcome = self.vote_by_number(&orchestrator, &snapshot, text).await?;
                Ok(InputOutcome::Voted(outcome))
            }
            _ => {
                self.chat(&orchestrator, &snapshot, text).await?;
                Ok(InputOutcome::Chatted)
            }
        }
    }

    fn introduce(&self, orchestrator: &PhaseOrchestrator, text: &str) -> InputOutcome {
        let local = orchestrator.local_player();
        self.transcript.show(
            self.sink.as_ref(),
            &ChatMessage::player(local, text, now_timestamp()),
        );
        self.state.lock().input_held = true;
        self.sink
            .set_input_enabled(false, "Waiting for the night to fall...");
        info!(player = local, "Introduction submitted");

        let lobby = self.lobby.clone();
        let sink = self.sink.clone();
        let state = self.state.clone();
        let after = orchestrator.clone();
        orchestrator.schedule(
            self.pacing.intro_completion,
            "intro_completion",
            async move {
                match lobby.complete_introduction().await {
                    Ok(done) => {
                        info!(next_phase = %done.phase, "Introductions completed");
                        state.lock().input_held = false;
                    }
                    Err(err) => {
                        warn!(error = %err, code = err.code(), "Completing introductions failed");
                        state.lock().input_held = false;
                        sink.set_input_enabled(true, Phase::Introduction.input_hint());
                    }
                }
                after.request_refresh();
            },
        );
        InputOutcome::Introduced
    }

    async fn vote_by_number(
        &self,
        orchestrator: &PhaseOrchestrator,
        snapshot: &GameStateSnapshot,
        text: &str,
    ) -> Result<VoteOutcome, InputError> {
        let candidates = snapshot.vote_candidates(orchestrator.local_player());
        let max = candidates.len();
        let index = text
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=max).contains(n))
            .ok_or(InputError::InvalidVoteNumber { max })?;
        let target = candidates[index - 1];
        let outcome = orchestrator.submit_vote(target).await?;
        self.notice(format!("You voted for {target}."));
        Ok(outcome)
    }

    async fn chat(
        &self,
        orchestrator: &PhaseOrchestrator,
        snapshot: &GameStateSnapshot,
        text: &str,
    ) -> Result<(), InputError> {
        let local = orchestrator.local_player();
        let timestamp = now_timestamp();
        self.transcript.show(
            self.sink.as_ref(),
            &ChatMessage::player(local, text, timestamp.clone()),
        );
        let outgoing = OutgoingChat {
            sender: local.to_string(),
            content: text.to_string(),
            timestamp,
            role: snapshot.role_of(local),
        };
        let reply = self.lobby.send_chat(&outgoing).await?;
        if let Some(advance) = reply.auto_progress {
            info!(next_phase = %advance.phase, next_turn = advance.turn, "Chat advanced the game");
            self.refresh().await;
        }
        Ok(())
    }

    pub async fn usage_stats(&self) -> Result<JsonValue, ClientError> {
        self.lobby.usage_stats().await
    }

    pub async fn reset_usage_stats(&self) -> Result<(), ClientError> {
        self.lobby.reset_usage_stats().await
    }

    /// Cancel the current game's pending work.
    pub fn teardown(&self) {
        let orchestrator = self.state.lock().orchestrator.clone();
        if let Some(orchestrator) = orchestrator {
            orchestrator.teardown();
        }
    }

    /// Drive the session until shutdown, end of input or end of game.
    pub async fn run(&self, mut input: mpsc::Receiver<String>, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(poll_ms = self.poll_interval.as_millis() as u64, "Session loop started");

        while !self.is_ended() {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    self.refresh().await;
                }
                _ = self.refresh.notified() => {
                    self.refresh().await;
                }
                line = input.recv() => match line {
                    Some(line) => {
                        if let Err(err) = self.handle_input(&line).await {
                            debug!(error = %err, "Input line not accepted");
                        }
                    }
                    None => {
                        info!("Input closed");
                        break;
                    }
                },
            }
        }

        self.teardown();
        info!("Session loop stopped");
    }
}
