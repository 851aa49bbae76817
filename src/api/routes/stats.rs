use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::generate::GenerationOutcome;
use crate::pipeline::{build_context, regenerate};
use crate::storage::snapshot::write_bundle;

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    /// RFC 3339 timestamp of the caller's copy.
    pub since: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UnchangedResponse {
    pub unchanged: bool,
    pub last_modified: Option<DateTime<Utc>>,
}

fn parse_since(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, ApiError> {
    raw.map(|s| {
        DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| ApiError::BadRequest(format!("Invalid 'since' timestamp: {}", s)))
    })
    .transpose()
}

/// Full regeneration, skipped when the store has not changed since `since`.
pub async fn full(
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> Result<Response, ApiError> {
    let since = parse_since(params.since.as_deref())?;
    let ctx = build_context(&state.storage, &state.default_season_starts)?;

    let outcome = state
        .coordinator
        .generate_if_changed(&ctx, since)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    match outcome {
        GenerationOutcome::Unchanged { last_modified } => Ok(Json(UnchangedResponse {
            unchanged: true,
            last_modified,
        })
        .into_response()),
        GenerationOutcome::Generated(bundle) => {
            write_bundle(&state.storage, &bundle)?;
            Ok(Json(&*bundle).into_response())
        }
    }
}

/// Season and last-10 averages, recomputed on every call.
pub async fn aggregates(State(state): State<AppState>) -> Result<Response, ApiError> {
    let bundle = regenerate(
        &state.storage,
        &state.coordinator,
        &state.default_season_starts,
        true,
    )
    .await?;
    Ok(Json(&*bundle).into_response())
}
