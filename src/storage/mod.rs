//! Filesystem storage.
//!
//! Everything lives under one data directory:
//! - `snapshot/`: the generated artifacts, one JSON file per dataset, plus
//!   `meta.json` describing the last run
//! - `allstars_config.json`, `captains.json`, `players.json` and
//!   `season_starts.json`: read-only inputs maintained outside the engine

pub mod snapshot;

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid document {path:?}: {source}")]
    InvalidDocument {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.data_dir.join("snapshot")
    }

    pub fn snapshot_meta_path(&self) -> PathBuf {
        self.snapshot_dir().join("meta.json")
    }

    pub fn allstars_config_path(&self) -> PathBuf {
        self.data_dir.join("allstars_config.json")
    }

    pub fn captains_path(&self) -> PathBuf {
        self.data_dir.join("captains.json")
    }

    pub fn roster_path(&self) -> PathBuf {
        self.data_dir.join("players.json")
    }

    pub fn season_starts_path(&self) -> PathBuf {
        self.data_dir.join("season_starts.json")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_paths() {
        let config = StorageConfig::new(PathBuf::from("/data"));

        assert_eq!(config.snapshot_dir(), PathBuf::from("/data/snapshot"));
        assert_eq!(config.snapshot_meta_path(), PathBuf::from("/data/snapshot/meta.json"));
        assert_eq!(config.allstars_config_path(), PathBuf::from("/data/allstars_config.json"));
        assert_eq!(config.captains_path(), PathBuf::from("/data/captains.json"));
        assert_eq!(config.roster_path(), PathBuf::from("/data/players.json"));
        assert_eq!(config.season_starts_path(), PathBuf::from("/data/season_starts.json"));
    }

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
    }
}
