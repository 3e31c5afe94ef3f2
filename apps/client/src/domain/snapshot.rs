use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{Phase, Role};

/// One authoritative view of the game, immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStateSnapshot {
    pub phase: Phase,
    #[serde(default)]
    pub turn: u32,
    #[serde(default)]
    pub players: Vec<String>,
    #[serde(default)]
    pub roles: BTreeMap<String, Role>,
    #[serde(default)]
    pub eliminated: BTreeSet<String>,
}

impl GameStateSnapshot {
    pub fn new(phase: Phase, turn: u32) -> Self {
        Self {
            phase,
            turn,
            players: Vec::new(),
            roles: BTreeMap::new(),
            eliminated: BTreeSet::new(),
        }
    }

    pub fn with_players<I, S>(mut self, players: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.players = players.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_eliminated<I, S>(mut self, eliminated: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.eliminated = eliminated.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_player(&self, name: &str) -> bool {
        self.players.iter().any(|p| p == name)
    }

    pub fn is_eliminated(&self, name: &str) -> bool {
        self.eliminated.contains(name)
    }

    pub fn role_of(&self, name: &str) -> Option<Role> {
        self.roles.get(name).copied()
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &str> {
        self.players
            .iter()
            .map(String::as_str)
            .filter(|p| !self.is_eliminated(p))
    }

    /// Players the local player may address by number when voting, in roster order.
    ///
    /// Eliminated players keep their number so numbering stays stable across
    /// rounds; `submit_vote` rejects them.
    pub fn vote_candidates<'a>(&'a self, local_player: &'a str) -> Vec<&'a str> {
        self.players
            .iter()
            .map(String::as_str)
            .filter(|p| *p != local_player)
            .collect()
    }
}
