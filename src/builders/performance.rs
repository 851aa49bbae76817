use std::collections::BTreeMap;

use tracing::debug;

use super::{require_columns, BuildContext, BuildError, Dataset};
use crate::models::{PerformancePoint, PerformanceSeries};
use crate::normalize::QueryResult;

/// Build one chart series per player. Nights the player missed keep null
/// values so every series shares the same x-axis.
pub fn build_performance_series(
    result: &QueryResult,
    ctx: &BuildContext,
) -> Result<Vec<PerformanceSeries>, BuildError> {
    let idx = require_columns(result, Dataset::PerformanceData, &["steam_id", "match_date"])?;

    let mut by_player: BTreeMap<String, PerformanceSeries> = BTreeMap::new();

    for row in &result.rows {
        let Some(steam_id) = idx.get_str(row, "steam_id").filter(|s| !s.is_empty()) else {
            debug!("Skipping performance row without steam_id");
            continue;
        };
        let Some(match_date) = idx.date_key(row, "match_date") else {
            debug!("Skipping performance row for {} with unparseable date", steam_id);
            continue;
        };

        let series = by_player.entry(steam_id.clone()).or_insert_with(|| {
            let raw_name = idx.get_str(row, "name").unwrap_or_default();
            PerformanceSeries {
                name: ctx.roster.resolve(&steam_id, &raw_name),
                steam_id: steam_id.clone(),
                performance: Vec::new(),
            }
        });
        if series.performance.iter().any(|p| p.match_date == match_date) {
            continue;
        }
        series.performance.push(PerformancePoint {
            match_date,
            hltv_2: idx.get_opt(row, "hltv_2"),
            adr: idx.get_opt(row, "adr"),
        });
    }

    let mut series: Vec<PerformanceSeries> = by_player.into_values().collect();
    for s in &mut series {
        s.performance.sort_by(|a, b| a.match_date.cmp(&b.match_date));
    }
    series.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.steam_id.cmp(&b.steam_id))
    });
    Ok(series)
}
