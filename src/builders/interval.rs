use std::collections::HashSet;

use tracing::debug;

use super::{require_columns, BuildContext, BuildError, Dataset};
use crate::calculate::{avg_clutches, clutch_success, win_rate};
use crate::models::SeasonAvgRow;
use crate::normalize::QueryResult;

/// Build interval averages (season or last-10), one row per steam id.
pub fn build_interval_averages(
    result: &QueryResult,
    ctx: &BuildContext,
    dataset: Dataset,
) -> Result<Vec<SeasonAvgRow>, BuildError> {
    let idx = require_columns(result, dataset, &["steam_id"])?;

    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(result.rows.len());

    for row in &result.rows {
        let Some(steam_id) = idx.get_str(row, "steam_id").filter(|s| !s.is_empty()) else {
            debug!("Skipping {} row without steam_id", dataset);
            continue;
        };
        if !seen.insert(steam_id.clone()) {
            debug!("Skipping duplicate {} row for {}", dataset, steam_id);
            continue;
        }

        let raw_name = idx.get_str(row, "name").unwrap_or_default();
        let matches = idx.get_count(row, "matches_in_interval");
        let wins = idx.get_count(row, "wins");
        let total_clutches = idx.get_count(row, "total_clutches");
        let total_clutches_won = idx.get_count(row, "total_clutches_won");

        rows.push(SeasonAvgRow {
            name: ctx.roster.resolve(&steam_id, &raw_name),
            steam_id,
            hltv_2: idx.get(row, "hltv_2", 0.0),
            adr: idx.get(row, "adr", 0.0),
            kd: idx.get(row, "kd", 0.0),
            mvp: idx.get(row, "mvp", 0.0),
            kills: idx.get(row, "kills", 0.0),
            deaths: idx.get(row, "deaths", 0.0),
            assists: idx.get(row, "assists", 0.0),
            hs_ratio: idx.get(row, "hs_ratio", 0.0),
            first_kill: idx.get(row, "first_kill", 0.0),
            first_death: idx.get(row, "first_death", 0.0),
            bomb_planted: idx.get(row, "bomb_planted", 0.0),
            bomb_defused: idx.get(row, "bomb_defused", 0.0),
            win_rate: win_rate(wins, matches),
            matches_in_interval: matches,
            total_clutches,
            total_clutches_won,
            avg_clutches: avg_clutches(total_clutches, matches),
            avg_clutches_won: avg_clutches(total_clutches_won, matches),
            clutch_success: clutch_success(total_clutches_won, total_clutches),
        });
    }

    Ok(rows)
}
