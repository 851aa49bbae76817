//! Per-night, per-map team sheets.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Rounds above this total mean the map went to overtime (MR12).
pub const REGULATION_ROUNDS: u32 = 24;

/// One player's averaged line for a (date, map, team) slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerMatchStats {
    pub steam_id: String,
    pub name: String,
    pub kills: f64,
    pub deaths: f64,
    pub assists: f64,
    pub kd: f64,
    pub adr: f64,
    pub hltv_2: f64,
    pub hs_ratio: f64,
    pub mvp: f64,
    pub first_kill: f64,
    pub first_death: f64,
    pub clutches_won: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamSheet {
    pub name: String,
    pub score: u32,
    pub players: Vec<PlayerMatchStats>,
}

impl TeamSheet {
    pub fn new(name: impl Into<String>, score: u32) -> Self {
        Self {
            name: name.into(),
            score,
            players: Vec::new(),
        }
    }

    pub fn has_player(&self, steam_id: &str) -> bool {
        self.players.iter().any(|p| p.steam_id == steam_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub total: u32,
    pub overtime: bool,
}

impl RoundSummary {
    pub fn from_scores(team1: u32, team2: u32) -> Self {
        let total = team1 + team2;
        Self {
            total,
            overtime: total > REGULATION_ROUNDS,
        }
    }
}

/// Result of one map. `team2` is empty until a second team name is seen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapResult {
    pub team1: TeamSheet,
    pub team2: TeamSheet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rounds: Option<RoundSummary>,
}

impl MapResult {
    /// Team names as an unordered pair.
    pub fn team_pair(&self) -> (&str, &str) {
        let (a, b) = (self.team1.name.as_str(), self.team2.name.as_str());
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Sheet of the named team, if it played this map.
    pub fn side(&self, team_name: &str) -> Option<(&TeamSheet, &TeamSheet)> {
        if self.team1.name == team_name {
            Some((&self.team1, &self.team2))
        } else if !self.team2.name.is_empty() && self.team2.name == team_name {
            Some((&self.team2, &self.team1))
        } else {
            None
        }
    }
}

/// One night's maps in play order.
///
/// Serialized as a JSON object keyed by map name; key order is kept on both
/// read and write since the league filter depends on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SonmacNight {
    maps: Vec<(String, MapResult)>,
}

impl SonmacNight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, map: &str) -> Option<&MapResult> {
        self.maps.iter().find(|(name, _)| name == map).map(|(_, r)| r)
    }

    pub fn get_mut(&mut self, map: &str) -> Option<&mut MapResult> {
        self.maps
            .iter_mut()
            .find(|(name, _)| name == map)
            .map(|(_, r)| r)
    }

    /// Insert or replace a map, keeping its original position on replace.
    pub fn insert(&mut self, map: impl Into<String>, result: MapResult) {
        let map = map.into();
        match self.get_mut(&map) {
            Some(existing) => *existing = result,
            None => self.maps.push((map, result)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MapResult)> {
        self.maps.iter().map(|(name, r)| (name.as_str(), r))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut MapResult)> {
        self.maps.iter_mut().map(|(name, r)| (name.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

impl Serialize for SonmacNight {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.maps.len()))?;
        for (name, result) in &self.maps {
            map.serialize_entry(name, result)?;
        }
        map.end()
    }
}

struct SonmacNightVisitor;

impl<'de> Visitor<'de> for SonmacNightVisitor {
    type Value = SonmacNight;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object of map name to map result")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut night = SonmacNight::new();
        while let Some((name, result)) = access.next_entry::<String, MapResult>()? {
            night.insert(name, result);
        }
        Ok(night)
    }
}

impl<'de> Deserialize<'de> for SonmacNight {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SonmacNightVisitor)
    }
}

/// The `sonmac_by_date` artifact: ISO date → night.
pub type SonmacByDate = BTreeMap<String, SonmacNight>;
