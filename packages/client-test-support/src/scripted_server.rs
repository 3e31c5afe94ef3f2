use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use mafia_client::api::{
    ActionInvoker, ChatLine, ChatReply, GameStateResponse, HistoryEntry, IntroductionCompleted,
    LobbyApi, OutgoingChat, PhaseAdvance, StartedGame, StateFetcher, VoteCast,
};
use mafia_client::{ClientError, GameStateSnapshot, Phase};
use parking_lot::Mutex;
use serde_json::{json, Value as JsonValue};

/// One call received by the [`ScriptedServer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchState,
    AutoProgress,
    AiSpeakSequential,
    AiVote,
    SubmitVote { voter: String, target: String },
    CheckConnection,
    StartGame { player_name: String },
    CompleteIntroduction,
    AiIntroductionSequential,
    SendChat { sender: String, content: String },
    UsageStats,
    ResetUsageStats,
}

struct Script {
    calls: Vec<Call>,
    state: GameStateResponse,
    failing: HashSet<&'static str>,
    vote_accepted: bool,
    ai_lines: Vec<ChatLine>,
    ai_introductions: Vec<ChatLine>,
    ai_votes: Vec<VoteCast>,
    chat_auto_progress: Option<PhaseAdvance>,
    /// Snapshots the server moves to on successive `auto_progress` calls.
    progressions: VecDeque<GameStateSnapshot>,
    usage: JsonValue,
}

/// In-memory game server that answers from a script and records every call.
///
/// Failures are injected per action name, using the same names as
/// [`ClientError::action`] (`"auto_progress"`, `"ai_vote"`, ...).
pub struct ScriptedServer {
    script: Mutex<Script>,
}

impl Default for ScriptedServer {
    fn default() -> Self {
        Self::new(GameStateSnapshot::new(Phase::Waiting, 0))
    }
}

impl ScriptedServer {
    pub fn new(snapshot: GameStateSnapshot) -> Self {
        Self {
            script: Mutex::new(Script {
                calls: Vec::new(),
                state: GameStateResponse::new(snapshot),
                failing: HashSet::new(),
                vote_accepted: true,
                ai_lines: Vec::new(),
                ai_introductions: Vec::new(),
                ai_votes: Vec::new(),
                chat_auto_progress: None,
                progressions: VecDeque::new(),
                usage: json!({"total_calls": 0}),
            }),
        }
    }

    pub fn set_snapshot(&self, snapshot: GameStateSnapshot) {
        self.script.lock().state.snapshot = snapshot;
    }

    pub fn snapshot(&self) -> GameStateSnapshot {
        self.script.lock().state.snapshot.clone()
    }

    pub fn push_history(&self, sender: &str, content: &str, timestamp: &str) {
        self.script.lock().state.chat_history.push(HistoryEntry {
            sender: sender.to_string(),
            content: content.to_string(),
            timestamp: timestamp.to_string(),
            role: None,
        });
    }

    /// Make every subsequent `action` call fail with a network error.
    pub fn fail(&self, action: &'static str) {
        self.script.lock().failing.insert(action);
    }

    pub fn recover(&self, action: &'static str) {
        self.script.lock().failing.remove(action);
    }

    pub fn set_vote_accepted(&self, accepted: bool) {
        self.script.lock().vote_accepted = accepted;
    }

    pub fn set_ai_lines(&self, lines: Vec<ChatLine>) {
        self.script.lock().ai_lines = lines;
    }

    pub fn set_ai_introductions(&self, lines: Vec<ChatLine>) {
        self.script.lock().ai_introductions = lines;
    }

    pub fn set_ai_votes(&self, votes: Vec<VoteCast>) {
        self.script.lock().ai_votes = votes;
    }

    pub fn set_chat_auto_progress(&self, advance: Option<PhaseAdvance>) {
        self.script.lock().chat_auto_progress = advance;
    }

    /// Queue the snapshot the server moves to on the next `auto_progress`.
    pub fn then_progress_to(&self, snapshot: GameStateSnapshot) {
        self.script.lock().progressions.push_back(snapshot);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.script.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub fn submitted_votes(&self) -> Vec<(String, String)> {
        self.script
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::SubmitVote { voter, target } => Some((voter.clone(), target.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn chats(&self) -> Vec<String> {
        self.script
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::SendChat { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call, action: &'static str) -> Result<(), ClientError> {
        let mut script = self.script.lock();
        script.calls.push(call);
        if script.failing.contains(action) {
            return Err(ClientError::network(action, "scripted failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl StateFetcher for ScriptedServer {
    async fn fetch_state(&self) -> Result<GameStateResponse, ClientError> {
        self.record(Call::FetchState, "fetch_state")?;
        Ok(self.script.lock().state.clone())
    }
}

#[async_trait]
impl ActionInvoker for ScriptedServer {
    async fn auto_progress(&self) -> Result<PhaseAdvance, ClientError> {
        self.record(Call::AutoProgress, "auto_progress")?;
        let mut script = self.script.lock();
        if let Some(next) = script.progressions.pop_front() {
            script.state.snapshot = next;
        }
        let snapshot = &script.state.snapshot;
        Ok(PhaseAdvance {
            phase: snapshot.phase,
            turn: snapshot.turn,
            announcement: None,
        })
    }

    async fn ai_speak_sequential(&self) -> Result<Vec<ChatLine>, ClientError> {
        self.record(Call::AiSpeakSequential, "ai_speak_sequential")?;
        Ok(self.script.lock().ai_lines.clone())
    }

    async fn ai_vote(&self) -> Result<Vec<VoteCast>, ClientError> {
        self.record(Call::AiVote, "ai_vote")?;
        Ok(self.script.lock().ai_votes.clone())
    }

    async fn submit_vote(&self, voter: &str, target: &str) -> Result<bool, ClientError> {
        self.record(
            Call::SubmitVote {
                voter: voter.to_string(),
                target: target.to_string(),
            },
            "submit_vote",
        )?;
        Ok(self.script.lock().vote_accepted)
    }
}

#[async_trait]
impl LobbyApi for ScriptedServer {
    async fn check_connection(&self) -> Result<(), ClientError> {
        self.record(Call::CheckConnection, "check_connection")
    }

    async fn start_game(&self, player_name: &str) -> Result<StartedGame, ClientError> {
        self.record(
            Call::StartGame {
                player_name: player_name.to_string(),
            },
            "start_game",
        )?;
        let script = self.script.lock();
        let snapshot = &script.state.snapshot;
        Ok(StartedGame {
            phase: snapshot.phase,
            players: snapshot.players.clone(),
            roles: snapshot.roles.clone(),
        })
    }

    async fn complete_introduction(&self) -> Result<IntroductionCompleted, ClientError> {
        self.record(Call::CompleteIntroduction, "complete_introduction")?;
        let mut script = self.script.lock();
        if let Some(next) = script.progressions.pop_front() {
            script.state.snapshot = next;
        }
        Ok(IntroductionCompleted {
            phase: script.state.snapshot.phase,
            announcement: Some("Night falls.".to_string()),
        })
    }

    async fn ai_introduction_sequential(&self) -> Result<Vec<ChatLine>, ClientError> {
        self.record(Call::AiIntroductionSequential, "ai_introduction_sequential")?;
        Ok(self.script.lock().ai_introductions.clone())
    }

    async fn send_chat(&self, message: &OutgoingChat) -> Result<ChatReply, ClientError> {
        self.record(
            Call::SendChat {
                sender: message.sender.clone(),
                content: message.content.clone(),
            },
            "send_chat",
        )?;
        let mut script = self.script.lock();
        script.state.chat_history.push(HistoryEntry {
            sender: message.sender.clone(),
            content: message.content.clone(),
            timestamp: message.timestamp.clone(),
            role: None,
        });
        Ok(ChatReply {
            auto_progress: script.chat_auto_progress.clone(),
        })
    }

    async fn usage_stats(&self) -> Result<JsonValue, ClientError> {
        self.record(Call::UsageStats, "usage_stats")?;
        Ok(self.script.lock().usage.clone())
    }

    async fn reset_usage_stats(&self) -> Result<(), ClientError> {
        self.record(Call::ResetUsageStats, "reset_usage_stats")?;
        self.script.lock().usage = json!({"total_calls": 0});
        Ok(())
    }
}
