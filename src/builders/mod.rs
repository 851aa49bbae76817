//! Dataset builders.
//!
//! One pure function per artifact, each turning a normalized result set into
//! one JSON shape:
//! - **season_avg** / **last10**: interval averages per player
//! - **night_avg**: per-player per-night lines with prior-10 history
//! - **sonmac_by_date**: per-night, per-map team sheets
//! - **duello_son_mac** / **duello_sezon**: duel matrices
//! - **performance_data**: chart series per player

mod duels;
mod interval;
mod night;
mod performance;
pub mod queries;
mod sonmac;

pub use duels::build_duel_matrix;
pub use interval::build_interval_averages;
pub use night::{build_night_averages, HISTORY_NIGHTS};
pub use performance::build_performance_series;
pub use sonmac::build_sonmac_by_date;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::PlayerRoster;
use crate::normalize::{ColumnIndex, QueryResult};

/// Errors raised when a result set does not have the expected shape.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Missing required column '{column}' for {dataset}")]
    MissingColumn {
        dataset: Dataset,
        column: &'static str,
    },
}

/// Parameters shared by every builder of one generation run.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub season_start: NaiveDate,
    pub roster: PlayerRoster,
}

impl BuildContext {
    pub fn new(season_start: NaiveDate, roster: PlayerRoster) -> Self {
        Self {
            season_start,
            roster,
        }
    }
}

/// The generated artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    SeasonAvg,
    NightAvg,
    Last10,
    SonmacByDate,
    DuelloSonMac,
    DuelloSezon,
    PerformanceData,
}

impl Dataset {
    pub const ALL: [Dataset; 7] = [
        Dataset::SeasonAvg,
        Dataset::NightAvg,
        Dataset::Last10,
        Dataset::SonmacByDate,
        Dataset::DuelloSonMac,
        Dataset::DuelloSezon,
        Dataset::PerformanceData,
    ];

    /// The cheap subset recomputed on every poll.
    pub const AGGREGATES: [Dataset; 2] = [Dataset::SeasonAvg, Dataset::Last10];

    /// Artifact name, also used as the snapshot file stem.
    pub fn name(&self) -> &'static str {
        match self {
            Dataset::SeasonAvg => "season_avg",
            Dataset::NightAvg => "night_avg",
            Dataset::Last10 => "last10",
            Dataset::SonmacByDate => "sonmac_by_date",
            Dataset::DuelloSonMac => "duello_son_mac",
            Dataset::DuelloSezon => "duello_sezon",
            Dataset::PerformanceData => "performance_data",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|d| d.name() == name)
    }

    /// SQL producing this dataset's rows.
    pub fn sql(&self, ctx: &BuildContext) -> String {
        match self {
            Dataset::SeasonAvg => queries::season_avg(ctx.season_start),
            Dataset::NightAvg => queries::NIGHT_AVG.to_string(),
            Dataset::Last10 => queries::last10(),
            Dataset::SonmacByDate => queries::SONMAC_BY_DATE.to_string(),
            Dataset::DuelloSonMac => queries::duello_son_mac(),
            Dataset::DuelloSezon => queries::duello_sezon(ctx.season_start),
            Dataset::PerformanceData => queries::performance(ctx.season_start),
        }
    }

    /// Whether the artifact is keyed by ISO date and can be sliced by window.
    pub fn is_date_keyed(&self) -> bool {
        matches!(self, Dataset::NightAvg | Dataset::SonmacByDate)
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Index `result`, failing fast when a key column is missing from a
/// non-empty result. Empty results carry no column metadata.
pub(crate) fn require_columns(
    result: &QueryResult,
    dataset: Dataset,
    columns: &[&'static str],
) -> Result<ColumnIndex, BuildError> {
    let idx = result.index();
    if result.rows.is_empty() {
        return Ok(idx);
    }
    match columns.iter().find(|c| !idx.has(c)) {
        Some(column) => Err(BuildError::MissingColumn {
            dataset,
            column: *column,
        }),
        None => Ok(idx),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;

    use super::BuildContext;
    use crate::models::PlayerRoster;

    pub fn context() -> BuildContext {
        BuildContext::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            PlayerRoster::new(),
        )
    }
}
