//! Collaborator interfaces consumed by the orchestrator and session.
//!
//! The game-state server is authoritative for phases, roles, eliminations and
//! vote tallies. The client only ever reaches it through these traits, which
//! keeps the orchestrator testable against scripted fakes.

pub mod dto;
pub mod http;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

pub use dto::{
    ChatLine, ChatReply, GameStateResponse, HistoryEntry, IntroductionCompleted, OutgoingChat,
    PhaseAdvance, StartedGame, VoteCast,
};
pub use http::HttpGameClient;

use crate::error::ClientError;

/// Returns the current authoritative game state.
#[async_trait]
pub trait StateFetcher: Send + Sync {
    async fn fetch_state(&self) -> Result<GameStateResponse, ClientError>;
}

/// Progression commands issued by the orchestrator, one call per action.
#[async_trait]
pub trait ActionInvoker: Send + Sync {
    /// Advance out of `night` or resolve `voting`.
    async fn auto_progress(&self) -> Result<PhaseAdvance, ClientError>;

    /// Let every living AI player speak once, in seat order.
    async fn ai_speak_sequential(&self) -> Result<Vec<ChatLine>, ClientError>;

    /// Let every AI player that has not voted yet cast its vote.
    async fn ai_vote(&self) -> Result<Vec<VoteCast>, ClientError>;

    /// Returns `Ok(false)` when the server refused the vote without failing the call.
    async fn submit_vote(&self, voter: &str, target: &str) -> Result<bool, ClientError>;
}

/// Calls outside the progression core: connection check, game start,
/// introductions, free-text chat and usage statistics.
#[async_trait]
pub trait LobbyApi: Send + Sync {
    async fn check_connection(&self) -> Result<(), ClientError>;

    async fn start_game(&self, player_name: &str) -> Result<StartedGame, ClientError>;

    async fn complete_introduction(&self) -> Result<IntroductionCompleted, ClientError>;

    async fn ai_introduction_sequential(&self) -> Result<Vec<ChatLine>, ClientError>;

    async fn send_chat(&self, message: &OutgoingChat) -> Result<ChatReply, ClientError>;

    async fn usage_stats(&self) -> Result<JsonValue, ClientError>;

    async fn reset_usage_stats(&self) -> Result<(), ClientError>;
}

/// Everything a full client session needs from the server.
pub trait GameServer: StateFetcher + ActionInvoker + LobbyApi {}

impl<T> GameServer for T where T: StateFetcher + ActionInvoker + LobbyApi {}
