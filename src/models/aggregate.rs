//! Interval averages (season and last-10 artifacts).

use serde::{Deserialize, Serialize};

/// One player's averaged stat line over an interval of matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonAvgRow {
    pub steam_id: String,
    pub name: String,
    pub hltv_2: f64,
    pub adr: f64,
    pub kd: f64,
    pub mvp: f64,
    pub kills: f64,
    pub deaths: f64,
    pub assists: f64,
    pub hs_ratio: f64,
    pub first_kill: f64,
    pub first_death: f64,
    pub bomb_planted: f64,
    pub bomb_defused: f64,
    /// Percentage of maps won.
    pub win_rate: f64,
    pub matches_in_interval: u32,
    pub total_clutches: u32,
    pub total_clutches_won: u32,
    pub avg_clutches: f64,
    pub avg_clutches_won: f64,
    pub clutch_success: f64,
}
