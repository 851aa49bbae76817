//! Canonical player names.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Steam ID → display name, loaded from the static roster file.
///
/// The recorder sometimes captures a stale in-game name; the roster keeps a
/// player's name stable across nights.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerRoster {
    names: HashMap<String, String>,
}

impl PlayerRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, steam_id: impl Into<String>, name: impl Into<String>) {
        self.names.insert(steam_id.into(), name.into());
    }

    /// Canonical name for the player, or `raw_name` when the roster has none.
    pub fn resolve(&self, steam_id: &str, raw_name: &str) -> String {
        self.names
            .get(steam_id)
            .filter(|n| !n.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| raw_name.to_string())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(String, String)> for PlayerRoster {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}
