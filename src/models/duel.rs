//! Player versus player kill tallies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Kills scored by the row player against the column player, and deaths
/// suffered from them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuelCell {
    pub kills: u32,
    pub deaths: u32,
}

impl DuelCell {
    pub fn new(kills: u32, deaths: u32) -> Self {
        Self { kills, deaths }
    }

    /// Parse the `"kills/deaths"` encoding produced by the duel queries.
    pub fn parse(raw: &str) -> Option<Self> {
        let (kills, deaths) = raw.trim().split_once('/')?;
        Some(Self {
            kills: kills.trim().parse().ok()?,
            deaths: deaths.trim().parse().ok()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuelMatrix {
    pub player_rows: Vec<String>,
    pub player_cols: Vec<String>,
    pub duels: BTreeMap<String, BTreeMap<String, DuelCell>>,
}

impl DuelMatrix {
    pub fn cell(&self, row: &str, col: &str) -> Option<DuelCell> {
        self.duels.get(row).and_then(|r| r.get(col)).copied()
    }
}
