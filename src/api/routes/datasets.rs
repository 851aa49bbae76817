use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::builders::Dataset;
use crate::models::{PerformanceSeries, SeasonWindow};
use crate::pipeline::load_season_settings;
use crate::seasons::{filter_by_window, filter_series_by_window, find_window};
use crate::storage::snapshot::read_artifact;

#[derive(Debug, Deserialize)]
pub struct DatasetParams {
    /// Season window id from `/api/seasons`.
    pub window: Option<String>,
}

/// One stored artifact, optionally sliced to a season window.
pub async fn dataset(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<DatasetParams>,
) -> Result<Json<Value>, ApiError> {
    let dataset = Dataset::from_name(&name)
        .ok_or_else(|| ApiError::NotFound(format!("Dataset '{}'", name)))?;

    let window = match params.window.as_deref() {
        None => None,
        Some(id) => {
            let settings = load_season_settings(&state.storage, &state.default_season_starts)?;
            let window = find_window(&settings.windows, id)
                .cloned()
                .ok_or_else(|| ApiError::NotFound(format!("Season window '{}'", id)))?;
            Some(window)
        }
    };

    let value = match window {
        None => read_artifact::<Value>(&state.storage, dataset)?,
        Some(window) => sliced(&state, dataset, &window)?,
    };
    value
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Dataset '{}' has not been generated", name)))
}

fn to_json<T: Serialize>(value: T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))
}

fn sliced(
    state: &AppState,
    dataset: Dataset,
    window: &SeasonWindow,
) -> Result<Option<Value>, ApiError> {
    if dataset.is_date_keyed() {
        let by_date: Option<BTreeMap<String, Value>> = read_artifact(&state.storage, dataset)?;
        by_date
            .map(|m| to_json(filter_by_window(&m, window)))
            .transpose()
    } else if dataset == Dataset::PerformanceData {
        let series: Option<Vec<PerformanceSeries>> = read_artifact(&state.storage, dataset)?;
        series
            .map(|s| to_json(filter_series_by_window(&s, window)))
            .transpose()
    } else {
        Err(ApiError::BadRequest(format!(
            "Dataset '{}' cannot be sliced by window",
            dataset
        )))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::build_router;
    use crate::api::routes::test_support::get_json;
    use crate::api::state::fixtures;

    #[tokio::test]
    async fn test_dataset_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let state = fixtures::state(dir.path());

        let (status, _) = get_json(build_router(state.clone()), "/api/datasets/night_avg").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        get_json(build_router(state.clone()), "/api/stats").await;

        let (status, json) = get_json(build_router(state.clone()), "/api/datasets/duello_sezon").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["duels"]["ace"]["bee"]["kills"], 3);

        let (status, _) = get_json(build_router(state), "/api/datasets/bogus").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_window_slicing() {
        let dir = tempfile::tempdir().unwrap();
        let state = fixtures::state(dir.path());
        get_json(build_router(state.clone()), "/api/stats").await;

        let (status, json) =
            get_json(build_router(state.clone()), "/api/datasets/night_avg?window=season-1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_object().unwrap().len(), 2);

        let (status, json) =
            get_json(build_router(state.clone()), "/api/datasets/performance_data?window=all").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json[0]["performance"][0]["HLTV 2"], 1.4);

        let (status, _) =
            get_json(build_router(state.clone()), "/api/datasets/season_avg?window=all").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            get_json(build_router(state), "/api/datasets/night_avg?window=season-9").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
