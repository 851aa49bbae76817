use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::StandingsReport;
use crate::pipeline::standings_report;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingsParams {
    /// Only count the first N All-Stars nights.
    pub up_to_night: Option<usize>,
    /// Restrict the report to one league id.
    pub league: Option<String>,
}

pub async fn standings(
    State(state): State<AppState>,
    Query(params): Query<StandingsParams>,
) -> Result<Json<StandingsReport>, ApiError> {
    let mut report = standings_report(
        &state.storage,
        &state.default_season_starts,
        params.up_to_night,
    )?;

    if let Some(league) = params.league {
        if !report.leagues.contains_key(&league) {
            return Err(ApiError::NotFound(format!("League '{}'", league)));
        }
        report.leagues.retain(|id, _| *id == league);
    }

    Ok(Json(report))
}
