//! Per-night averaged stat lines.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A stat column of the night-average artifact.
///
/// The labels are consumed verbatim by the dashboard, spacing and
/// capitalization included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NightStat {
    Hltv,
    Hltv2,
    Adr,
    Kd,
    Mvp,
    Kills,
    Deaths,
    Assists,
    Headshots,
    HeadshotRatio,
    FirstKill,
    FirstDeath,
    BombPlanted,
    BombDefused,
    ClutchOpportunity,
    ClutchesWon,
    ClutchSuccess,
    Matches,
}

impl NightStat {
    pub const ALL: [NightStat; 18] = [
        NightStat::Hltv,
        NightStat::Hltv2,
        NightStat::Adr,
        NightStat::Kd,
        NightStat::Mvp,
        NightStat::Kills,
        NightStat::Deaths,
        NightStat::Assists,
        NightStat::Headshots,
        NightStat::HeadshotRatio,
        NightStat::FirstKill,
        NightStat::FirstDeath,
        NightStat::BombPlanted,
        NightStat::BombDefused,
        NightStat::ClutchOpportunity,
        NightStat::ClutchesWon,
        NightStat::ClutchSuccess,
        NightStat::Matches,
    ];

    /// JSON key in the night-average artifact.
    pub fn label(&self) -> &'static str {
        match self {
            NightStat::Hltv => "HLTV",
            NightStat::Hltv2 => "HLTV 2",
            NightStat::Adr => "ADR",
            NightStat::Kd => "K/D",
            NightStat::Mvp => "MVP",
            NightStat::Kills => "Kills",
            NightStat::Deaths => "Deaths",
            NightStat::Assists => "Assists",
            NightStat::Headshots => "HS",
            NightStat::HeadshotRatio => "HS/Kill ratio",
            NightStat::FirstKill => "First Kill",
            NightStat::FirstDeath => "First Death",
            NightStat::BombPlanted => "Bomb Planted",
            NightStat::BombDefused => "Bomb Defused",
            NightStat::ClutchOpportunity => "Clutch Opportunity",
            NightStat::ClutchesWon => "Clutches Won",
            NightStat::ClutchSuccess => "Clutch Success",
            NightStat::Matches => "Nr of Matches",
        }
    }

    /// Column name in the night-average query, for stats read straight from SQL.
    /// Clutch-derived stats are computed after the fact and have no column.
    pub fn column(&self) -> Option<&'static str> {
        match self {
            NightStat::Hltv => Some("hltv"),
            NightStat::Hltv2 => Some("hltv_2"),
            NightStat::Adr => Some("adr"),
            NightStat::Kd => Some("kd"),
            NightStat::Mvp => Some("mvp"),
            NightStat::Kills => Some("kills"),
            NightStat::Deaths => Some("deaths"),
            NightStat::Assists => Some("assists"),
            NightStat::Headshots => Some("headshots"),
            NightStat::HeadshotRatio => Some("hs_ratio"),
            NightStat::FirstKill => Some("first_kill"),
            NightStat::FirstDeath => Some("first_death"),
            NightStat::BombPlanted => Some("bomb_planted"),
            NightStat::BombDefused => Some("bomb_defused"),
            NightStat::Matches => Some("matches_played"),
            NightStat::ClutchOpportunity | NightStat::ClutchesWon | NightStat::ClutchSuccess => {
                None
            }
        }
    }

    /// Whether the stat carries `_10` and `_diff` companions.
    pub fn has_history(&self) -> bool {
        !matches!(self, NightStat::Matches)
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.label() == label)
    }
}

impl std::fmt::Display for NightStat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Key of the prior-10-nights average companion of a stat.
pub fn history_key(label: &str) -> String {
    format!("{}_10", label)
}

/// Key of the night-minus-history delta companion of a stat.
pub fn diff_key(label: &str) -> String {
    format!("{}_diff", label)
}

/// One player's averaged stat line for one night.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NightAvgRow {
    pub steam_id: String,
    pub name: String,

    /// Stat values keyed by label, plus `<label>_10` / `<label>_diff`.
    /// A `null` companion means the player had no earlier night.
    #[serde(flatten)]
    pub stats: BTreeMap<String, Option<f64>>,
}

impl NightAvgRow {
    pub fn new(steam_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            steam_id: steam_id.into(),
            name: name.into(),
            stats: BTreeMap::new(),
        }
    }

    /// Look up a stat by its label. Missing and null both yield `None`.
    pub fn stat(&self, label: &str) -> Option<f64> {
        self.stats.get(label).copied().flatten()
    }

    pub fn set(&mut self, label: impl Into<String>, value: Option<f64>) {
        self.stats.insert(label.into(), value);
    }
}

/// The `night_avg` artifact: ISO date → player rows.
pub type NightAvgByDate = BTreeMap<String, Vec<NightAvgRow>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_unique() {
        let mut labels: Vec<_> = NightStat::ALL.iter().map(|s| s.label()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), NightStat::ALL.len());
    }

    #[test]
    fn test_from_label() {
        assert_eq!(NightStat::from_label("HLTV 2"), Some(NightStat::Hltv2));
        assert_eq!(NightStat::from_label("Nr of Matches"), Some(NightStat::Matches));
        assert_eq!(NightStat::from_label("hltv 2"), None);
    }

    #[test]
    fn test_night_row_serializes_flat_labels() {
        let mut row = NightAvgRow::new("7656", "ace");
        row.set(NightStat::Kd.label(), Some(1.25));
        row.set(history_key("K/D"), None);

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["steam_id"], "7656");
        assert_eq!(json["K/D"], 1.25);
        assert!(json["K/D_10"].is_null());
    }

    #[test]
    fn test_stat_lookup_treats_null_as_missing() {
        let mut row = NightAvgRow::new("1", "a");
        row.set("HLTV 2", None);
        assert_eq!(row.stat("HLTV 2"), None);
        assert_eq!(row.stat("ADR"), None);
    }

    #[test]
    fn test_night_row_deserialization() {
        let row: NightAvgRow =
            serde_json::from_str(r#"{"steam_id":"1","name":"a","HLTV 2":1.1,"HLTV 2_diff":null}"#)
                .unwrap();
        assert_eq!(row.stat("HLTV 2"), Some(1.1));
        assert_eq!(row.stats.len(), 2);
    }
}
