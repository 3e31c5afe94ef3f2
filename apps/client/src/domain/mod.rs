//! Client-side view of the game: phases, roles, snapshots and chat messages.
//!
//! Everything here is plain data. The authoritative values come from the
//! game-state server; this module only gives them types.

pub mod message;
pub mod phase;
pub mod snapshot;

pub use message::{now_timestamp, ChatMessage, MessageKind};
pub use phase::{Phase, Role};
pub use snapshot::GameStateSnapshot;
