//! Snapshot files and input documents.
//!
//! Artifacts are written one file per dataset so a partial run never
//! clobbers a dataset it failed to rebuild.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{StorageConfig, StorageError};
use crate::builders::Dataset;
use crate::generate::{DatasetBundle, DatasetError};
use crate::models::{AllStarsConfig, CaptainRecord, PlayerRoster};

/// Description of the snapshot on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    /// Datasets with a file in the snapshot.
    #[serde(default)]
    pub datasets: Vec<Dataset>,
    /// Latest failure per dataset, cleared once the dataset is rebuilt.
    #[serde(rename = "__errors", default)]
    pub errors: Vec<DatasetError>,
}

/// Serializes `meta.json` read-merge-write cycles within the process.
static META_LOCK: Mutex<()> = Mutex::new(());

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&serde_json::to_vec_pretty(value)?)?;
    tmp.persist(path).map_err(|e| e.error)?;
    debug!("Wrote {:?}", path);
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read(path)?;
    serde_json::from_slice(&contents)
        .map(Some)
        .map_err(|source| StorageError::InvalidDocument {
            path: path.to_path_buf(),
            source,
        })
}

/// Write every artifact present in `bundle` and merge the run into
/// `meta.json`. Returns the number of dataset files written.
pub fn write_bundle(config: &StorageConfig, bundle: &DatasetBundle) -> Result<usize, StorageError> {
    let dir = config.snapshot_dir();
    let mut written = Vec::new();
    for dataset in Dataset::ALL {
        if let Some(value) = bundle.artifact(dataset)? {
            write_json(&dir.join(format!("{}.json", dataset.name())), &value)?;
            written.push(dataset);
        }
    }

    let _guard = META_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let meta = merge_meta(read_meta(config)?, bundle, &written);
    write_json(&config.snapshot_meta_path(), &meta)?;

    info!("Wrote {} datasets to {:?}", written.len(), dir);
    Ok(written.len())
}

/// Fold one run into the previous meta. Datasets the run did not attempt
/// keep their earlier failure, and a partial run keeps the last full run's
/// `last_modified`.
fn merge_meta(previous: Option<SnapshotMeta>, bundle: &DatasetBundle, written: &[Dataset]) -> SnapshotMeta {
    let attempted: Vec<Dataset> = written
        .iter()
        .copied()
        .chain(bundle.errors.iter().map(|e| e.dataset))
        .collect();
    let full_run = Dataset::ALL.iter().all(|d| attempted.contains(d));
    let order = |d: &Dataset| Dataset::ALL.iter().position(|a| a == d);

    let (mut datasets, mut errors, last_modified) = match previous {
        Some(meta) => {
            let last_modified = if full_run {
                bundle.last_modified
            } else {
                meta.last_modified.or(bundle.last_modified)
            };
            (meta.datasets, meta.errors, last_modified)
        }
        None => (Vec::new(), Vec::new(), bundle.last_modified),
    };

    for dataset in written {
        if !datasets.contains(dataset) {
            datasets.push(*dataset);
        }
    }
    datasets.sort_by_key(order);

    errors.retain(|e| !attempted.contains(&e.dataset));
    errors.extend(bundle.errors.iter().cloned());
    errors.sort_by_key(|e| order(&e.dataset));

    SnapshotMeta {
        generated_at: bundle.generated_at,
        last_modified,
        datasets,
        errors,
    }
}

pub fn read_meta(config: &StorageConfig) -> Result<Option<SnapshotMeta>, StorageError> {
    read_json(&config.snapshot_meta_path())
}

/// One artifact as stored, `None` when the snapshot lacks it.
pub fn read_artifact<T: DeserializeOwned>(
    config: &StorageConfig,
    dataset: Dataset,
) -> Result<Option<T>, StorageError> {
    read_json(&config.snapshot_dir().join(format!("{}.json", dataset.name())))
}

/// League configuration; defaults when the file is absent.
pub fn read_allstars_config(config: &StorageConfig) -> Result<AllStarsConfig, StorageError> {
    Ok(read_json(&config.allstars_config_path())?.unwrap_or_default())
}

pub fn read_captains(config: &StorageConfig) -> Result<Vec<CaptainRecord>, StorageError> {
    Ok(read_json(&config.captains_path())?.unwrap_or_default())
}

pub fn read_roster(config: &StorageConfig) -> Result<PlayerRoster, StorageError> {
    Ok(read_json(&config.roster_path())?.unwrap_or_default())
}

/// Season start override, `None` when no override file exists.
pub fn read_season_starts(config: &StorageConfig) -> Result<Option<Vec<NaiveDate>>, StorageError> {
    read_json(&config.season_starts_path())
}
