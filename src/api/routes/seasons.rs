use axum::extract::State;
use axum::Json;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::pipeline::{load_season_settings, SeasonSettings};

/// Season starts, the current season and the selectable windows.
pub async fn list(State(state): State<AppState>) -> Result<Json<SeasonSettings>, ApiError> {
    let settings = load_season_settings(&state.storage, &state.default_season_starts)?;
    Ok(Json(settings))
}
