//! All-Stars league configuration, captain assignments and standings.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::NightStat;

/// Positional team slot of a night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamKey {
    Team1,
    Team2,
}

/// A captain designation, one per (date, team slot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptainRecord {
    pub steam_id: String,
    pub date: NaiveDate,
    pub team_key: TeamKey,
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub set_by_uid: Option<String>,
    /// Milliseconds since the epoch.
    #[serde(default)]
    pub set_at: Option<i64>,
}

/// Map wins a side needs before a non-tied series counts as decided.
pub const SERIES_DECIDED_WINS: u32 = 2;

/// Outcome of a night's series from one team's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeriesBucket {
    #[serde(rename = "2-0W")]
    SweepWin,
    #[serde(rename = "2-1W")]
    CloseWin,
    #[serde(rename = "1-1D")]
    Draw,
    #[serde(rename = "2-1L")]
    CloseLoss,
    #[serde(rename = "2-0L")]
    SweepLoss,
}

impl SeriesBucket {
    pub fn label(&self) -> &'static str {
        match self {
            SeriesBucket::SweepWin => "2-0W",
            SeriesBucket::CloseWin => "2-1W",
            SeriesBucket::Draw => "1-1D",
            SeriesBucket::CloseLoss => "2-1L",
            SeriesBucket::SweepLoss => "2-0L",
        }
    }

    /// Classify a series from one side's map wins and losses.
    ///
    /// Equal records are a draw. Otherwise the series is decided only once
    /// one side has won at least two maps; a sweep is a decided series with
    /// no map lost. Returns `None` when no map was decided or neither side
    /// reached two wins.
    pub fn classify(wins: u32, losses: u32) -> Option<Self> {
        if wins == 0 && losses == 0 {
            return None;
        }
        if wins != losses && wins.max(losses) < SERIES_DECIDED_WINS {
            return None;
        }
        let bucket = if wins == losses {
            SeriesBucket::Draw
        } else if wins > losses {
            if wins >= 2 && losses == 0 {
                SeriesBucket::SweepWin
            } else {
                SeriesBucket::CloseWin
            }
        } else if losses >= 2 && wins == 0 {
            SeriesBucket::SweepLoss
        } else {
            SeriesBucket::CloseLoss
        };
        Some(bucket)
    }
}

impl std::fmt::Display for SeriesBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Bonus points per series outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoints {
    #[serde(rename = "2-0W")]
    pub sweep_win: f64,
    #[serde(rename = "2-1W")]
    pub close_win: f64,
    #[serde(rename = "1-1D")]
    pub draw: f64,
    #[serde(rename = "2-1L")]
    pub close_loss: f64,
    #[serde(rename = "2-0L")]
    pub sweep_loss: f64,
}

impl SeriesPoints {
    pub fn get(&self, bucket: SeriesBucket) -> f64 {
        match bucket {
            SeriesBucket::SweepWin => self.sweep_win,
            SeriesBucket::CloseWin => self.close_win,
            SeriesBucket::Draw => self.draw,
            SeriesBucket::CloseLoss => self.close_loss,
            SeriesBucket::SweepLoss => self.sweep_loss,
        }
    }
}

impl Default for SeriesPoints {
    fn default() -> Self {
        Self {
            sweep_win: 0.3,
            close_win: 0.2,
            draw: 0.1,
            close_loss: 0.05,
            sweep_loss: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct League {
    pub id: String,
    pub name: String,
    /// Steam IDs; nobody else appears in this league's standings.
    pub players: Vec<String>,
}

/// Versioned All-Stars scoring configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllStarsConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Night-average label used as the base score, e.g. "HLTV 2".
    #[serde(default = "default_use_stat")]
    pub use_stat: String,

    #[serde(default)]
    pub series_points: SeriesPoints,

    #[serde(default)]
    pub leagues: Vec<League>,

    /// Overrides the resolved season start when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_start: Option<NaiveDate>,
}

fn default_version() -> u32 {
    1
}

fn default_use_stat() -> String {
    "HLTV 2".to_string()
}

impl Default for AllStarsConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            use_stat: default_use_stat(),
            series_points: SeriesPoints::default(),
            leagues: Vec::new(),
            season_start: None,
        }
    }
}

impl AllStarsConfig {
    /// The night-average stat named by `use_stat`, `None` for an unknown label.
    pub fn scoring_stat(&self) -> Option<NightStat> {
        NightStat::from_label(&self.use_stat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionChange {
    Up,
    Down,
    Same,
    New,
}

/// One scored night of a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NightBreakdown {
    pub date: NaiveDate,
    pub team_name: String,
    pub stat: f64,
    pub bucket: SeriesBucket,
    pub series_points: f64,
    pub points: f64,
    pub dropped: bool,
    pub was_captain: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStanding {
    pub steam_id: String,
    pub name: String,
    /// Nights played (scored).
    pub oyn: u32,
    /// Captain tokens.
    pub kpt: u32,
    pub puan_raw: f64,
    pub puan_adj: f64,
    pub night_breakdown: Vec<NightBreakdown>,
    pub meets_kriteria: bool,
    pub position_change: PositionChange,
}

/// Standings for every league plus the nights they were computed from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingsReport {
    pub leagues: BTreeMap<String, Vec<PlayerStanding>>,
    pub included_dates: Vec<NaiveDate>,
    /// All-Stars nights in the season before `upToNight` truncation.
    pub total_nights: usize,
    pub season_start: Option<NaiveDate>,
    pub warnings: Vec<String>,
}
