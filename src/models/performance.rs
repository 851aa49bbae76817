//! Per-player performance time series for charts.

use serde::{Deserialize, Serialize};

/// One night on a player's chart. `None` means the player did not play,
/// which the chart draws differently from a zero rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformancePoint {
    pub match_date: String,
    #[serde(rename = "HLTV 2")]
    pub hltv_2: Option<f64>,
    #[serde(rename = "ADR")]
    pub adr: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSeries {
    pub name: String,
    pub steam_id: String,
    pub performance: Vec<PerformancePoint>,
}
