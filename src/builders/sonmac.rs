use tracing::{debug, warn};

use super::{require_columns, BuildContext, BuildError, Dataset};
use crate::models::{MapResult, PlayerMatchStats, RoundSummary, SonmacByDate, TeamSheet};
use crate::normalize::{ColumnIndex, QueryResult};
use serde_json::Value;

/// Build the per-night map breakdown.
///
/// Maps keep the order they first appear in the result. The first team seen
/// on a map becomes `team1`, the second `team2`; any further team is dropped.
pub fn build_sonmac_by_date(
    result: &QueryResult,
    ctx: &BuildContext,
) -> Result<SonmacByDate, BuildError> {
    let idx = require_columns(
        result,
        Dataset::SonmacByDate,
        &["match_date", "map_name", "team_name", "steam_id"],
    )?;

    let mut nights = SonmacByDate::new();

    for row in &result.rows {
        let Some(date) = idx.date_key(row, "match_date") else {
            debug!("Skipping sonmac row with unparseable date");
            continue;
        };
        let (Some(map_name), Some(team_name), Some(steam_id)) = (
            idx.get_str(row, "map_name").filter(|s| !s.is_empty()),
            idx.get_str(row, "team_name").filter(|s| !s.is_empty()),
            idx.get_str(row, "steam_id").filter(|s| !s.is_empty()),
        ) else {
            debug!("Skipping incomplete sonmac row on {}", date);
            continue;
        };

        let night = nights.entry(date.clone()).or_default();
        if night.get(&map_name).is_none() {
            night.insert(map_name.clone(), MapResult::default());
        }
        let Some(map) = night.get_mut(&map_name) else {
            continue;
        };

        let score = idx.get_count(row, "team_score");
        let sheet = if map.team1.name.is_empty() || map.team1.name == team_name {
            &mut map.team1
        } else if map.team2.name.is_empty() || map.team2.name == team_name {
            &mut map.team2
        } else {
            warn!(
                "Dropping third team '{}' on {} {} (already {} vs {})",
                team_name, date, map_name, map.team1.name, map.team2.name
            );
            continue;
        };

        if sheet.name.is_empty() {
            *sheet = TeamSheet::new(team_name, score);
        } else {
            sheet.score = sheet.score.max(score);
        }

        if sheet.has_player(&steam_id) {
            debug!("Skipping duplicate line for {} on {} {}", steam_id, date, map_name);
            continue;
        }
        sheet.players.push(player_line(&idx, row, steam_id, ctx));
    }

    for night in nights.values_mut() {
        for (_, map) in night.iter_mut() {
            if !map.team2.name.is_empty() {
                map.rounds = Some(RoundSummary::from_scores(map.team1.score, map.team2.score));
            }
        }
    }

    Ok(nights)
}

fn player_line(
    idx: &ColumnIndex,
    row: &[Value],
    steam_id: String,
    ctx: &BuildContext,
) -> PlayerMatchStats {
    let raw_name = idx.get_str(row, "name").unwrap_or_default();
    PlayerMatchStats {
        name: ctx.roster.resolve(&steam_id, &raw_name),
        steam_id,
        kills: idx.get(row, "kills", 0.0),
        deaths: idx.get(row, "deaths", 0.0),
        assists: idx.get(row, "assists", 0.0),
        kd: idx.get(row, "kd", 0.0),
        adr: idx.get(row, "adr", 0.0),
        hltv_2: idx.get(row, "hltv_2", 0.0),
        hs_ratio: idx.get(row, "hs_ratio", 0.0),
        mvp: idx.get(row, "mvp", 0.0),
        first_kill: idx.get(row, "first_kill", 0.0),
        first_death: idx.get(row, "first_death", 0.0),
        clutches_won: idx.get(row, "clutches_won", 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::fixtures::context;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn line(date: &str, map: &str, team: &str, score: u32, id: &str) -> Vec<Value> {
        vec![json!(date), json!(map), json!(team), json!(score), json!(id), json!(id), json!(1.1)]
    }

    fn result(rows: Vec<Vec<Value>>) -> QueryResult {
        QueryResult::from_parts(
            &["match_date", "map_name", "team_name", "team_score", "steam_id", "name", "hltv_2"],
            rows,
        )
    }

    #[test]
    fn test_builds_two_teams_per_map() {
        let result = result(vec![
            line("2025-03-01", "de_nuke", "Alpha", 13, "1"),
            line("2025-03-01", "de_nuke", "Alpha", 13, "2"),
            line("2025-03-01", "de_nuke", "Bravo", 9, "3"),
        ]);

        let nights = build_sonmac_by_date(&result, &context()).unwrap();
        let map = nights["2025-03-01"].get("de_nuke").unwrap();

        assert_eq!(map.team1.name, "Alpha");
        assert_eq!(map.team1.players.len(), 2);
        assert_eq!(map.team2.name, "Bravo");
        assert_eq!(map.team2.score, 9);
        assert_eq!(map.rounds, Some(RoundSummary::from_scores(13, 9)));
        assert_eq!(map.team1.players[0].hltv_2, 1.1);
    }

    #[test]
    fn test_maps_keep_result_order() {
        let result = result(vec![
            line("2025-03-01", "de_nuke", "A", 13, "1"),
            line("2025-03-01", "de_ancient", "A", 13, "1"),
            line("2025-03-01", "de_mirage", "A", 13, "1"),
        ]);

        let nights = build_sonmac_by_date(&result, &context()).unwrap();
        let names: Vec<_> = nights["2025-03-01"].iter().map(|(n, _)| n).collect();

        assert_eq!(names, vec!["de_nuke", "de_ancient", "de_mirage"]);
    }

    #[test]
    fn test_third_team_is_dropped() {
        let result = result(vec![
            line("2025-03-01", "de_nuke", "A", 13, "1"),
            line("2025-03-01", "de_nuke", "B", 7, "2"),
            line("2025-03-01", "de_nuke", "C", 1, "3"),
        ]);

        let nights = build_sonmac_by_date(&result, &context()).unwrap();
        let map = nights["2025-03-01"].get("de_nuke").unwrap();

        assert!(!map.team1.has_player("3"));
        assert!(!map.team2.has_player("3"));
    }

    #[test]
    fn test_single_team_map_has_no_rounds() {
        let result = result(vec![line("2025-03-01", "de_nuke", "A", 13, "1")]);
        let nights = build_sonmac_by_date(&result, &context()).unwrap();
        let map = nights["2025-03-01"].get("de_nuke").unwrap();

        assert!(map.team2.name.is_empty());
        assert_eq!(map.rounds, None);
    }

    #[test]
    fn test_missing_map_column_is_an_error() {
        let result = QueryResult::from_parts(
            &["match_date", "team_name", "steam_id"],
            vec![vec![json!("2025-03-01"), json!("A"), json!("1")]],
        );
        assert!(build_sonmac_by_date(&result, &context()).is_err());
    }
}
