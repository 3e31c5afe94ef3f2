#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod orchestrator;
pub mod presentation;
pub mod scheduler;
pub mod session;
pub mod validation;


pub use api::{ActionInvoker, GameServer, HttpGameClient, LobbyApi, StateFetcher};
pub use config::ClientConfig;
pub use domain::{ChatMessage, GameStateSnapshot, MessageKind, Phase, Role};
pub use error::{ClientError, ConfigError, InputError, VoteError};
pub use orchestrator::{
    OrchestratorState, PhaseOrchestrator, ProgressAction, ScheduledAction, SkipReason,
    TransitionReport, VoteOutcome,
};
pub use presentation::{PresentationSink, TerminalSink, Transcript};
pub use scheduler::{ManualScheduler, Pacing, Scheduler, TokioScheduler};
pub use session::{GameSession, InputOutcome};

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    test_bootstrap::logging::init();
}
