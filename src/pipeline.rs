//! Glue between storage, season resolution, generation and standings.
//!
//! Shared by the CLI and the HTTP handlers so both resolve the season and
//! the build context the same way.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::builders::{BuildContext, Dataset};
use crate::generate::{DatasetBundle, GenerationCoordinator};
use crate::models::{NightAvgByDate, SeasonWindow, SonmacByDate, StandingsReport};
use crate::seasons::{build_windows, current_season_start, resolve_season_starts, SEASON_STARTS_ENV};
use crate::standings::{compute_with_movement, StandingsInput};
use crate::storage::snapshot::{
    read_allstars_config, read_artifact, read_captains, read_roster, read_season_starts,
    write_bundle,
};
use crate::storage::{StorageConfig, StorageError};

/// Resolved season starts and the current season.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonSettings {
    pub season_starts: Vec<NaiveDate>,
    pub current_season_start: NaiveDate,
    pub windows: Vec<SeasonWindow>,
}

/// Match dates of the stored night averages.
pub fn observed_dates(storage: &StorageConfig) -> Result<Vec<NaiveDate>, StorageError> {
    let night_avg: Option<NightAvgByDate> = read_artifact(storage, Dataset::NightAvg)?;
    let bundle = DatasetBundle {
        night_avg,
        ..DatasetBundle::empty(None)
    };
    Ok(bundle.observed_dates())
}

/// Resolve season starts (override file, then `SEASON_STARTS`, then
/// `defaults`) against the observed match dates.
pub fn load_season_settings(
    storage: &StorageConfig,
    defaults: &[NaiveDate],
) -> Result<SeasonSettings, StorageError> {
    let env_value = std::env::var(SEASON_STARTS_ENV).ok();
    let season_starts =
        resolve_season_starts(read_season_starts(storage)?, env_value.as_deref(), defaults);

    let mut observed = observed_dates(storage)?;
    let windows = build_windows(&season_starts, &observed);
    if observed.is_empty() {
        observed.push(Utc::now().date_naive());
    }
    let current_season_start = current_season_start(&season_starts, &observed).unwrap_or_else(|| {
        warn!("No season starts configured; using the earliest observed date");
        observed.iter().min().copied().unwrap_or_else(|| Utc::now().date_naive())
    });

    Ok(SeasonSettings {
        season_starts,
        current_season_start,
        windows,
    })
}

/// Build parameters for a generation run.
pub fn build_context(
    storage: &StorageConfig,
    defaults: &[NaiveDate],
) -> Result<BuildContext, StorageError> {
    let settings = load_season_settings(storage, defaults)?;
    let roster = read_roster(storage)?;
    Ok(BuildContext::new(settings.current_season_start, roster))
}

/// Run a full or aggregates-only generation and persist it.
pub async fn regenerate(
    storage: &StorageConfig,
    coordinator: &GenerationCoordinator,
    defaults: &[NaiveDate],
    aggregates_only: bool,
) -> Result<Arc<DatasetBundle>, StorageError> {
    let ctx = build_context(storage, defaults)?;
    let bundle = if aggregates_only {
        Arc::new(coordinator.generate_aggregates(&ctx).await)
    } else {
        coordinator.generate_all(&ctx).await
    };
    write_bundle(storage, &bundle)?;
    Ok(bundle)
}

/// Standings from the stored snapshot and the league input documents.
pub fn standings_report(
    storage: &StorageConfig,
    defaults: &[NaiveDate],
    up_to_night: Option<usize>,
) -> Result<StandingsReport, StorageError> {
    let config = read_allstars_config(storage)?;
    let unknown_stat = config.scoring_stat().is_none();
    if unknown_stat {
        warn!("Unknown scoring stat '{}' in All-Stars config", config.use_stat);
    }
    let captains = read_captains(storage)?;
    let night_avg: Option<NightAvgByDate> = read_artifact(storage, Dataset::NightAvg)?;
    let sonmac: Option<SonmacByDate> = read_artifact(storage, Dataset::SonmacByDate)?;

    let season_start = match config.season_start {
        Some(start) => start,
        None => load_season_settings(storage, defaults)?.current_season_start,
    };

    let mut missing = Vec::new();
    if night_avg.is_none() {
        missing.push(Dataset::NightAvg);
    }
    if sonmac.is_none() {
        missing.push(Dataset::SonmacByDate);
    }
    let night_avg = night_avg.unwrap_or_default();
    let sonmac = sonmac.unwrap_or_default();

    let input = StandingsInput {
        night_avg: &night_avg,
        sonmac: &sonmac,
        captains: &captains,
        config: &config,
        season_start,
    };
    let mut report = compute_with_movement(&input, up_to_night);
    if unknown_stat {
        report.warnings.push(format!(
            "Scoring stat '{}' is not a night-average column; no night can be scored",
            config.use_stat
        ));
    }
    for dataset in missing {
        report
            .warnings
            .push(format!("Snapshot has no {} yet; run generate first", dataset));
    }

    info!(
        "Standings from {} captain records, season start {}",
        captains.len(),
        season_start
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::fixtures;
    use pretty_assertions::assert_eq;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn storage() -> (tempfile::TempDir, StorageConfig) {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::new(dir.path().to_path_buf());
        (dir, config)
    }

    #[test]
    fn test_season_settings_from_override_file() {
        let (_dir, storage) = storage();
        std::fs::write(storage.season_starts_path(), r#"["2025-01-01","2020-01-01"]"#).unwrap();

        let settings = load_season_settings(&storage, &[d("2024-09-02")]).unwrap();

        assert_eq!(settings.season_starts, vec![d("2020-01-01"), d("2025-01-01")]);
        assert_eq!(settings.current_season_start, d("2025-01-01"));
        // Nothing generated yet
        assert!(settings.windows.is_empty());
    }

    #[tokio::test]
    async fn test_regenerate_then_standings() {
        let (_dir, storage) = storage();
        std::fs::write(storage.season_starts_path(), r#"["2025-01-01"]"#).unwrap();

        let ctx = build_context(&storage, &[]).unwrap();
        assert_eq!(ctx.season_start, d("2025-01-01"));
        let coordinator = GenerationCoordinator::new(Arc::new(fixtures::source(&ctx)));

        let bundle = regenerate(&storage, &coordinator, &[], false).await.unwrap();
        assert!(bundle.errors.is_empty());

        let settings = load_season_settings(&storage, &[]).unwrap();
        let ids: Vec<_> = settings.windows.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["season-1", "all"]);

        // No league configured and no captains
        let report = standings_report(&storage, &[], None).unwrap();
        assert!(report.leagues.is_empty());
        assert_eq!(report.total_nights, 0);
        assert_eq!(report.season_start, Some(d("2025-01-01")));
    }

    #[test]
    fn test_unknown_scoring_stat_warns() {
        let (_dir, storage) = storage();
        std::fs::write(storage.allstars_config_path(), r#"{"useStat":"Rating"}"#).unwrap();

        let report = standings_report(&storage, &[d("2025-01-01")], None).unwrap();

        assert!(report.warnings.iter().any(|w| w.contains("'Rating'")));
    }

    #[test]
    fn test_standings_without_snapshot_warns() {
        let (_dir, storage) = storage();
        let report = standings_report(&storage, &[d("2025-01-01")], None).unwrap();

        assert!(report.warnings.iter().any(|w| w.contains("night_avg")));
        assert!(report.warnings.iter().any(|w| w.contains("sonmac_by_date")));
    }
}
