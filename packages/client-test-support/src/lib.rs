//! Client test support utilities
//!
//! Scripted stand-ins for the game server and the presentation sink, plus
//! unified logging initialization for the client's integration tests.

pub mod logging;
pub mod recording_sink;
pub mod scripted_server;

pub use recording_sink::RecordingSink;
pub use scripted_server::{Call, ScriptedServer};
