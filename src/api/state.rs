use std::sync::Arc;

use chrono::NaiveDate;

use crate::generate::GenerationCoordinator;
use crate::storage::StorageConfig;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<StorageConfig>,
    pub coordinator: Arc<GenerationCoordinator>,
    /// Season starts used when no override file or `SEASON_STARTS` is set.
    pub default_season_starts: Arc<Vec<NaiveDate>>,
    pub cors_origin: String,
}

impl AppState {
    pub fn new(
        storage: StorageConfig,
        coordinator: GenerationCoordinator,
        default_season_starts: Vec<NaiveDate>,
        cors_origin: impl Into<String>,
    ) -> Self {
        Self {
            storage: Arc::new(storage),
            coordinator: Arc::new(coordinator),
            default_season_starts: Arc::new(default_season_starts),
            cors_origin: cors_origin.into(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::AppState;
    use crate::builders::BuildContext;
    use crate::generate::{fixtures, GenerationCoordinator};
    use crate::models::PlayerRoster;
    use crate::storage::StorageConfig;

    /// State over a temp data dir whose season starts on 2025-01-01, backed
    /// by a source answering every dataset query.
    pub fn state(dir: &std::path::Path) -> AppState {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        std::fs::write(dir.join("season_starts.json"), r#"["2025-01-01"]"#).unwrap();
        let ctx = BuildContext::new(start, PlayerRoster::new());
        let coordinator = GenerationCoordinator::new(Arc::new(fixtures::source(&ctx)));
        AppState::new(StorageConfig::new(dir.to_path_buf()), coordinator, vec![start], "*")
    }
}
