use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use super::{require_columns, BuildContext, BuildError, Dataset};
use crate::calculate::{avg_clutches, clutch_success, prior_window_mean};
use crate::models::{diff_key, history_key, NightAvgByDate, NightAvgRow, NightStat};
use crate::normalize::QueryResult;

/// Number of earlier nights averaged into the `_10` companions.
pub const HISTORY_NIGHTS: usize = 10;

struct NightEntry {
    date: String,
    row: NightAvgRow,
}

/// Build the per-night artifact, computing each stat's prior-10-nights
/// average and delta from the player's own earlier nights.
pub fn build_night_averages(
    result: &QueryResult,
    ctx: &BuildContext,
) -> Result<NightAvgByDate, BuildError> {
    let idx = require_columns(result, Dataset::NightAvg, &["steam_id", "match_date"])?;

    let mut seen = HashSet::new();
    let mut entries: Vec<NightEntry> = Vec::with_capacity(result.rows.len());

    for row in &result.rows {
        let Some(steam_id) = idx.get_str(row, "steam_id").filter(|s| !s.is_empty()) else {
            debug!("Skipping night row without steam_id");
            continue;
        };
        let Some(date) = idx.date_key(row, "match_date") else {
            debug!("Skipping night row for {} with unparseable date", steam_id);
            continue;
        };
        if !seen.insert((steam_id.clone(), date.clone())) {
            debug!("Skipping duplicate night row for {} on {}", steam_id, date);
            continue;
        }

        let raw_name = idx.get_str(row, "name").unwrap_or_default();
        let mut night = NightAvgRow::new(steam_id.clone(), ctx.roster.resolve(&steam_id, &raw_name));

        for stat in NightStat::ALL {
            if let Some(column) = stat.column() {
                // Absent column: stat unknown. Null cell: defaults to zero.
                let value = idx.has(column).then(|| idx.get(row, column, 0.0));
                night.set(stat.label(), value);
            }
        }

        let matches = idx.get_count(row, "matches_played");
        let total_clutches = idx.get_count(row, "total_clutches");
        let total_won = idx.get_count(row, "total_clutches_won");
        night.set(
            NightStat::ClutchOpportunity.label(),
            Some(avg_clutches(total_clutches, matches)),
        );
        night.set(
            NightStat::ClutchesWon.label(),
            Some(avg_clutches(total_won, matches)),
        );
        night.set(
            NightStat::ClutchSuccess.label(),
            Some(clutch_success(total_won, total_clutches)),
        );

        entries.push(NightEntry { date, row: night });
    }

    attach_history(&mut entries);

    let mut by_date: NightAvgByDate = BTreeMap::new();
    for entry in entries {
        by_date.entry(entry.date).or_default().push(entry.row);
    }
    Ok(by_date)
}

/// Fill `<label>_10` and `<label>_diff` for every stat with history.
fn attach_history(entries: &mut [NightEntry]) {
    let mut by_player: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, entry) in entries.iter().enumerate() {
        by_player.entry(entry.row.steam_id.clone()).or_default().push(i);
    }

    for positions in by_player.values_mut() {
        // ISO keys sort chronologically.
        positions.sort_by(|a, b| entries[*a].date.cmp(&entries[*b].date));

        for stat in NightStat::ALL.iter().filter(|s| s.has_history()) {
            let label = stat.label();
            let values: Vec<Option<f64>> =
                positions.iter().map(|&i| entries[i].row.stat(label)).collect();

            for (n, &i) in positions.iter().enumerate() {
                let history = prior_window_mean(&values, n, HISTORY_NIGHTS);
                let diff = match (values[n], history) {
                    (Some(now), Some(before)) => Some(now - before),
                    _ => None,
                };
                let row = &mut entries[i].row;
                row.set(history_key(label), history);
                row.set(diff_key(label), diff);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::fixtures::context;
    use serde_json::json;

    fn result(rows: Vec<Vec<serde_json::Value>>) -> QueryResult {
        QueryResult::from_parts(
            &[
                "steam_id",
                "name",
                "match_date",
                "hltv_2",
                "matches_played",
                "total_clutches",
                "total_clutches_won",
            ],
            rows,
        )
    }

    fn row(id: &str, date: &str, hltv: f64) -> Vec<serde_json::Value> {
        vec![json!(id), json!(id), json!(date), json!(hltv), json!(2), json!(4), json!(1)]
    }

    #[test]
    fn test_groups_rows_by_date() {
        let result = result(vec![
            row("1", "2025-03-01", 1.0),
            row("2", "2025-03-01T20:00:00Z", 1.1),
            row("1", "2025-03-08", 1.2),
        ]);

        let nights = build_night_averages(&result, &context()).unwrap();

        assert_eq!(nights.len(), 2);
        assert_eq!(nights["2025-03-01"].len(), 2);
        assert_eq!(nights["2025-03-08"][0].stat("HLTV 2"), Some(1.2));
    }

    #[test]
    fn test_human_facing_labels_and_clutches() {
        let result = result(vec![row("1", "2025-03-01", 1.0)]);
        let nights = build_night_averages(&result, &context()).unwrap();
        let night = &nights["2025-03-01"][0];

        assert_eq!(night.stat("Nr of Matches"), Some(2.0));
        assert_eq!(night.stat("Clutch Opportunity"), Some(2.0));
        assert_eq!(night.stat("Clutches Won"), Some(0.5));
        assert_eq!(night.stat("Clutch Success"), Some(25.0));
        // Column not in the result
        assert_eq!(night.stat("ADR"), None);
    }

    #[test]
    fn test_history_and_diff() {
        let result = result(vec![
            row("1", "2025-03-15", 1.6),
            row("1", "2025-03-01", 1.0),
            row("1", "2025-03-08", 1.2),
        ]);

        let nights = build_night_averages(&result, &context()).unwrap();

        let first = &nights["2025-03-01"][0];
        assert_eq!(first.stat("HLTV 2_10"), None);
        assert_eq!(first.stat("HLTV 2_diff"), None);
        assert!(first.stats.contains_key("HLTV 2_10"));

        let third = &nights["2025-03-15"][0];
        assert!((third.stat("HLTV 2_10").unwrap() - 1.1).abs() < 1e-9);
        assert!((third.stat("HLTV 2_diff").unwrap() - 0.5).abs() < 1e-9);

        // No companions for the match count
        assert!(!third.stats.contains_key("Nr of Matches_10"));
    }

    #[test]
    fn test_history_window_is_ten_nights() {
        let rows: Vec<_> = (1..=12)
            .map(|d| row("1", &format!("2025-03-{:02}", d), d as f64))
            .collect();
        let nights = build_night_averages(&result(rows), &context()).unwrap();

        // Nights 2..=11 precede the 12th: mean 6.5
        let last = &nights["2025-03-12"][0];
        assert_eq!(last.stat("HLTV 2_10"), Some(6.5));
    }

    #[test]
    fn test_bad_dates_are_skipped() {
        let result = result(vec![row("1", "not a date", 1.0), row("1", "2025-03-01", 1.0)]);
        let nights = build_night_averages(&result, &context()).unwrap();
        assert_eq!(nights.len(), 1);
    }

    #[test]
    fn test_zero_matches_never_divides_by_zero() {
        let result = result(vec![vec![
            json!("1"),
            json!("a"),
            json!("2025-03-01"),
            json!(1.0),
            json!(0),
            json!(0),
            json!(0),
        ]]);
        let nights = build_night_averages(&result, &context()).unwrap();
        let night = &nights["2025-03-01"][0];

        for label in ["Clutch Opportunity", "Clutches Won", "Clutch Success"] {
            assert_eq!(night.stat(label), Some(0.0));
        }
    }
}
