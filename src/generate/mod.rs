//! Generation coordinator.
//!
//! Runs the dataset builders against a [`QuerySource`] and collects their
//! artifacts into one [`DatasetBundle`]:
//! - Full runs are single-flight: concurrent callers share one computation
//! - Aggregates-only runs rebuild season and last-10 averages on every call
//! - Change detection skips a full run when the store has not moved

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::builders::{
    build_duel_matrix, build_interval_averages, build_night_averages, build_performance_series,
    build_sonmac_by_date, BuildContext, BuildError, Dataset,
};
use crate::models::{DuelMatrix, NightAvgByDate, PerformanceSeries, SeasonAvgRow, SonmacByDate};
use crate::normalize::parse_date_key;
use crate::source::{QueryError, QuerySource};

/// Why one dataset could not be produced.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// A dataset that failed, as reported under `__errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetError {
    pub dataset: Dataset,
    pub error: String,
}

/// Every artifact of one generation run. Failed datasets are absent and
/// listed in `errors`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_avg: Option<Vec<SeasonAvgRow>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub night_avg: Option<NightAvgByDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last10: Option<Vec<SeasonAvgRow>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sonmac_by_date: Option<SonmacByDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duello_son_mac: Option<DuelMatrix>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duello_sezon: Option<DuelMatrix>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_data: Option<Vec<PerformanceSeries>>,

    #[serde(rename = "__errors", default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<DatasetError>,

    pub generated_at: DateTime<Utc>,

    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

impl DatasetBundle {
    pub fn empty(last_modified: Option<DateTime<Utc>>) -> Self {
        Self {
            season_avg: None,
            night_avg: None,
            last10: None,
            sonmac_by_date: None,
            duello_son_mac: None,
            duello_sezon: None,
            performance_data: None,
            errors: Vec::new(),
            generated_at: Utc::now(),
            last_modified,
        }
    }

    /// One artifact as JSON, `None` when it was not produced.
    pub fn artifact(&self, dataset: Dataset) -> Result<Option<serde_json::Value>, serde_json::Error> {
        let value = match dataset {
            Dataset::SeasonAvg => self.season_avg.as_ref().map(serde_json::to_value),
            Dataset::NightAvg => self.night_avg.as_ref().map(serde_json::to_value),
            Dataset::Last10 => self.last10.as_ref().map(serde_json::to_value),
            Dataset::SonmacByDate => self.sonmac_by_date.as_ref().map(serde_json::to_value),
            Dataset::DuelloSonMac => self.duello_son_mac.as_ref().map(serde_json::to_value),
            Dataset::DuelloSezon => self.duello_sezon.as_ref().map(serde_json::to_value),
            Dataset::PerformanceData => self.performance_data.as_ref().map(serde_json::to_value),
        };
        value.transpose()
    }

    /// Datasets present in this bundle.
    pub fn produced(&self) -> Vec<Dataset> {
        Dataset::ALL
            .into_iter()
            .filter(|d| match d {
                Dataset::SeasonAvg => self.season_avg.is_some(),
                Dataset::NightAvg => self.night_avg.is_some(),
                Dataset::Last10 => self.last10.is_some(),
                Dataset::SonmacByDate => self.sonmac_by_date.is_some(),
                Dataset::DuelloSonMac => self.duello_son_mac.is_some(),
                Dataset::DuelloSezon => self.duello_sezon.is_some(),
                Dataset::PerformanceData => self.performance_data.is_some(),
            })
            .collect()
    }

    /// Distinct match dates seen in the night averages, ascending.
    pub fn observed_dates(&self) -> Vec<NaiveDate> {
        self.night_avg
            .iter()
            .flat_map(|nights| nights.keys())
            .filter_map(|key| parse_date_key(key))
            .collect()
    }

    /// A bundle in which every dataset failed with `reason`.
    fn aborted(reason: &str) -> Self {
        let mut bundle = Self::empty(None);
        bundle.errors = Dataset::ALL
            .into_iter()
            .map(|dataset| DatasetError {
                dataset,
                error: format!("Generation aborted: {}", reason),
            })
            .collect();
        bundle
    }

    fn record(&mut self, dataset: Dataset, error: GenerateError) {
        warn!("Dataset {} failed: {}", dataset, error);
        self.errors.push(DatasetError {
            dataset,
            error: error.to_string(),
        });
    }
}

/// Result of a conditional regeneration.
#[derive(Debug, Clone)]
pub enum GenerationOutcome {
    /// The store has not changed since the caller's timestamp.
    Unchanged { last_modified: Option<DateTime<Utc>> },
    Generated(Arc<DatasetBundle>),
}

type SharedRun = Shared<BoxFuture<'static, Arc<DatasetBundle>>>;
type InFlight = Arc<Mutex<Option<(u64, SharedRun)>>>;

/// Coordinates generation runs over one query source.
pub struct GenerationCoordinator {
    source: Arc<dyn QuerySource>,
    in_flight: InFlight,
    epoch: AtomicU64,
}

impl GenerationCoordinator {
    pub fn new(source: Arc<dyn QuerySource>) -> Self {
        Self {
            source,
            in_flight: Arc::new(Mutex::new(None)),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Store's last-modified timestamp.
    pub async fn last_modified(&self) -> Result<Option<DateTime<Utc>>, QueryError> {
        self.source.last_modified().await
    }

    /// Run all seven builders. Callers arriving while a run is in flight
    /// join it instead of starting another, and receive its bundle even if
    /// their own context differs.
    ///
    /// The run is a spawned task: it completes and clears the in-flight
    /// slot even when every caller has gone away.
    pub async fn generate_all(&self, ctx: &BuildContext) -> Arc<DatasetBundle> {
        let run = {
            let mut slot = self.in_flight.lock().await;
            match slot.as_ref() {
                Some((epoch, run)) => {
                    debug!("Joining in-flight generation #{}", epoch);
                    run.clone()
                }
                None => {
                    let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
                    let run = self.spawn_run(epoch, ctx.clone());
                    *slot = Some((epoch, run.clone()));
                    run
                }
            }
        };
        run.await
    }

    fn spawn_run(&self, epoch: u64, ctx: BuildContext) -> SharedRun {
        let source = Arc::clone(&self.source);
        let in_flight = Arc::clone(&self.in_flight);

        let task = tokio::spawn(async move {
            let bundle = Arc::new(run_datasets(source.as_ref(), &ctx, &Dataset::ALL).await);
            let mut slot = in_flight.lock().await;
            if matches!(slot.as_ref(), Some((current, _)) if *current == epoch) {
                *slot = None;
            }
            bundle
        });

        async move {
            match task.await {
                Ok(bundle) => bundle,
                Err(e) => {
                    warn!("Generation #{} aborted: {}", epoch, e);
                    Arc::new(DatasetBundle::aborted(&e.to_string()))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Rebuild season and last-10 averages only.
    pub async fn generate_aggregates(&self, ctx: &BuildContext) -> DatasetBundle {
        run_datasets(self.source.as_ref(), ctx, &Dataset::AGGREGATES).await
    }

    /// Full run unless the store is no newer than `since`. A store that
    /// reports no timestamp always regenerates.
    pub async fn generate_if_changed(
        &self,
        ctx: &BuildContext,
        since: Option<DateTime<Utc>>,
    ) -> Result<GenerationOutcome, QueryError> {
        let last_modified = self.last_modified().await?;
        if let (Some(since), Some(at)) = (since, last_modified) {
            if at <= since {
                debug!("Store unchanged since {}", since);
                return Ok(GenerationOutcome::Unchanged { last_modified });
            }
        }
        Ok(GenerationOutcome::Generated(self.generate_all(ctx).await))
    }
}

async fn run_datasets(
    source: &dyn QuerySource,
    ctx: &BuildContext,
    datasets: &[Dataset],
) -> DatasetBundle {
    let started = Instant::now();
    let last_modified = match source.last_modified().await {
        Ok(at) => at,
        Err(e) => {
            warn!("Could not read last-modified from {}: {}", source.name(), e);
            None
        }
    };

    let mut bundle = DatasetBundle::empty(last_modified);
    for &dataset in datasets {
        if let Err(e) = run_dataset(source, ctx, dataset, &mut bundle).await {
            bundle.record(dataset, e);
        }
    }

    info!(
        "Generated {} of {} datasets from {} in {:?}",
        datasets.len() - bundle.errors.len(),
        datasets.len(),
        source.name(),
        started.elapsed()
    );
    bundle
}

async fn run_dataset(
    source: &dyn QuerySource,
    ctx: &BuildContext,
    dataset: Dataset,
    bundle: &mut DatasetBundle,
) -> Result<(), GenerateError> {
    let result = source.execute(&dataset.sql(ctx)).await?;
    debug!("{}: {} rows", dataset, result.rows.len());

    match dataset {
        Dataset::SeasonAvg => {
            bundle.season_avg = Some(build_interval_averages(&result, ctx, dataset)?)
        }
        Dataset::Last10 => bundle.last10 = Some(build_interval_averages(&result, ctx, dataset)?),
        Dataset::NightAvg => bundle.night_avg = Some(build_night_averages(&result, ctx)?),
        Dataset::SonmacByDate => bundle.sonmac_by_date = Some(build_sonmac_by_date(&result, ctx)?),
        Dataset::DuelloSonMac => {
            bundle.duello_son_mac = Some(build_duel_matrix(&result, ctx, dataset)?)
        }
        Dataset::DuelloSezon => bundle.duello_sezon = Some(build_duel_matrix(&result, ctx, dataset)?),
        Dataset::PerformanceData => {
            bundle.performance_data = Some(build_performance_series(&result, ctx)?)
        }
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;

    use super::*;
    use crate::builders::fixtures::context;
    use crate::normalize::QueryResult;
    use crate::source::StaticQuerySource;

    #[tokio::test]
    async fn test_generate_all_produces_every_dataset() {
        let ctx = context();
        let coordinator = GenerationCoordinator::new(Arc::new(fixtures::source(&ctx)));

        let bundle = coordinator.generate_all(&ctx).await;

        assert!(bundle.errors.is_empty(), "{:?}", bundle.errors);
        assert_eq!(bundle.produced(), Dataset::ALL.to_vec());
        assert_eq!(bundle.observed_dates().len(), 2);
    }

    #[tokio::test]
    async fn test_failing_dataset_does_not_abort_siblings() {
        let ctx = context();
        let source = fixtures::source(&ctx)
            .with_failure(&Dataset::DuelloSezon.sql(&ctx), "relation does not exist")
            .with_result(
                &Dataset::NightAvg.sql(&ctx),
                QueryResult::from_parts(&["name"], vec![vec![serde_json::json!("ace")]]),
            );
        let coordinator = GenerationCoordinator::new(Arc::new(source));

        let bundle = coordinator.generate_all(&ctx).await;

        assert_eq!(bundle.errors.len(), 2);
        assert_eq!(bundle.errors[0].dataset, Dataset::NightAvg);
        assert!(bundle.errors[0].error.contains("steam_id"));
        assert_eq!(bundle.errors[1].dataset, Dataset::DuelloSezon);
        assert!(bundle.duello_sezon.is_none());
        assert!(bundle.duello_son_mac.is_some());
        assert!(bundle.season_avg.is_some());

        let json = serde_json::to_value(bundle.as_ref()).unwrap();
        assert_eq!(json["__errors"][1]["dataset"], "duello_sezon");
        assert!(json.get("duello_sezon").is_none());
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_run() {
        let ctx = context();
        let source = Arc::new(fixtures::source(&ctx).with_delay(Duration::from_millis(20)));
        let coordinator = GenerationCoordinator::new(source.clone());

        let (a, b) = tokio::join!(coordinator.generate_all(&ctx), coordinator.generate_all(&ctx));

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(source.calls(), Dataset::ALL.len());
    }

    #[tokio::test]
    async fn test_slot_is_cleared_after_run() {
        let ctx = context();
        let source = Arc::new(fixtures::source(&ctx));
        let coordinator = GenerationCoordinator::new(source.clone());

        let first = coordinator.generate_all(&ctx).await;
        let second = coordinator.generate_all(&ctx).await;

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls(), 2 * Dataset::ALL.len());
    }

    #[tokio::test]
    async fn test_run_survives_dropped_caller() {
        let ctx = context();
        let source = Arc::new(fixtures::source(&ctx).with_delay(Duration::from_millis(20)));
        let coordinator = GenerationCoordinator::new(source.clone());

        let cancelled =
            tokio::time::timeout(Duration::from_millis(30), coordinator.generate_all(&ctx)).await;
        assert!(cancelled.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;
        // The abandoned run finished and released the slot
        assert_eq!(source.calls(), Dataset::ALL.len());
        assert!(coordinator.in_flight.lock().await.is_none());

        let requested_at = Utc::now();
        let bundle = coordinator.generate_all(&ctx).await;

        assert!(bundle.generated_at >= requested_at);
        assert_eq!(source.calls(), 2 * Dataset::ALL.len());
    }

    #[tokio::test]
    async fn test_aggregates_only() {
        let ctx = context();
        let source = Arc::new(fixtures::source(&ctx));
        let coordinator = GenerationCoordinator::new(source.clone());

        let bundle = coordinator.generate_aggregates(&ctx).await;

        assert_eq!(bundle.produced(), Dataset::AGGREGATES.to_vec());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_generate_if_changed() {
        let ctx = context();
        let stamp = Utc.with_ymd_and_hms(2025, 3, 8, 22, 0, 0).unwrap();
        let coordinator =
            GenerationCoordinator::new(Arc::new(fixtures::source(&ctx).with_last_modified(stamp)));

        let outcome = coordinator.generate_if_changed(&ctx, Some(stamp)).await.unwrap();
        assert!(matches!(outcome, GenerationOutcome::Unchanged { last_modified: Some(at) } if at == stamp));

        let earlier = stamp - chrono::Duration::hours(1);
        let outcome = coordinator.generate_if_changed(&ctx, Some(earlier)).await.unwrap();
        match outcome {
            GenerationOutcome::Generated(bundle) => assert_eq!(bundle.last_modified, Some(stamp)),
            other => panic!("expected a run, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_store_timestamp_regenerates() {
        let ctx = context();
        let coordinator = GenerationCoordinator::new(Arc::new(StaticQuerySource::new()));

        let outcome = coordinator.generate_if_changed(&ctx, Some(Utc::now())).await.unwrap();

        match outcome {
            GenerationOutcome::Generated(bundle) => {
                assert_eq!(bundle.errors.len(), Dataset::ALL.len())
            }
            other => panic!("expected a run, got {:?}", other),
        }
    }
}
