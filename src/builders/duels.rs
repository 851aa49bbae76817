use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use super::{require_columns, BuildContext, BuildError, Dataset};
use crate::models::{DuelCell, DuelMatrix};
use crate::normalize::QueryResult;

/// Build a square duel matrix keyed by canonical player name.
///
/// Rows and columns list the same players, sorted case-insensitively, and
/// every pair has a cell (zeros when the two never met).
pub fn build_duel_matrix(
    result: &QueryResult,
    ctx: &BuildContext,
    dataset: Dataset,
) -> Result<DuelMatrix, BuildError> {
    let idx = require_columns(result, dataset, &["row_steam_id", "col_steam_id", "duel"])?;

    let mut players = BTreeSet::new();
    let mut duels: BTreeMap<String, BTreeMap<String, DuelCell>> = BTreeMap::new();

    for row in &result.rows {
        let (Some(row_id), Some(col_id)) = (
            idx.get_str(row, "row_steam_id").filter(|s| !s.is_empty()),
            idx.get_str(row, "col_steam_id").filter(|s| !s.is_empty()),
        ) else {
            debug!("Skipping {} row without both steam ids", dataset);
            continue;
        };
        let row_name = ctx
            .roster
            .resolve(&row_id, &idx.get_str(row, "row_name").unwrap_or_else(|| row_id.clone()));
        let col_name = ctx
            .roster
            .resolve(&col_id, &idx.get_str(row, "col_name").unwrap_or_else(|| col_id.clone()));

        players.insert(row_name.clone());
        players.insert(col_name.clone());

        let raw = idx.get_str(row, "duel").unwrap_or_default();
        let Some(cell) = DuelCell::parse(&raw) else {
            warn!("Unparseable {} cell '{}' for {} vs {}", dataset, raw, row_name, col_name);
            continue;
        };
        duels.entry(row_name).or_default().insert(col_name, cell);
    }

    let mut names: Vec<String> = players.into_iter().collect();
    names.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));

    for row_name in &names {
        let cells = duels.entry(row_name.clone()).or_default();
        for col_name in &names {
            cells.entry(col_name.clone()).or_default();
        }
    }

    Ok(DuelMatrix {
        player_rows: names.clone(),
        player_cols: names,
        duels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::fixtures::context;
    use crate::models::PlayerRoster;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn cell(row: &str, col: &str, duel: &str) -> Vec<Value> {
        vec![json!(row), json!(row), json!(col), json!(col), json!(duel)]
    }

    fn result(rows: Vec<Vec<Value>>) -> QueryResult {
        QueryResult::from_parts(
            &["row_steam_id", "row_name", "col_steam_id", "col_name", "duel"],
            rows,
        )
    }

    #[test]
    fn test_matrix_is_square_and_sorted() {
        let result = result(vec![cell("bob", "Alice", "3/1"), cell("Alice", "bob", "1/3")]);

        let matrix = build_duel_matrix(&result, &context(), Dataset::DuelloSezon).unwrap();

        assert_eq!(matrix.player_rows, vec!["Alice", "bob"]);
        assert_eq!(matrix.player_rows, matrix.player_cols);
        assert_eq!(matrix.cell("bob", "Alice"), Some(DuelCell::new(3, 1)));
        assert_eq!(matrix.cell("Alice", "bob"), Some(DuelCell::new(1, 3)));
    }

    #[test]
    fn test_missing_pairs_are_backfilled() {
        let result = result(vec![cell("a", "b", "2/0"), cell("c", "a", "1/1")]);

        let matrix = build_duel_matrix(&result, &context(), Dataset::DuelloSonMac).unwrap();

        for row in &matrix.player_rows {
            for col in &matrix.player_cols {
                assert!(matrix.cell(row, col).is_some(), "{} vs {}", row, col);
            }
        }
        assert_eq!(matrix.cell("b", "c"), Some(DuelCell::default()));
        assert_eq!(matrix.cell("a", "a"), Some(DuelCell::default()));
    }

    #[test]
    fn test_unparseable_cell_still_lists_players() {
        let result = result(vec![cell("a", "b", "garbage")]);
        let matrix = build_duel_matrix(&result, &context(), Dataset::DuelloSezon).unwrap();

        assert_eq!(matrix.player_rows, vec!["a", "b"]);
        assert_eq!(matrix.cell("a", "b"), Some(DuelCell::default()));
    }

    #[test]
    fn test_names_are_canonical() {
        let mut ctx = context();
        ctx.roster = PlayerRoster::from_iter([("a".to_string(), "Zed".to_string())]);

        let result = result(vec![cell("a", "b", "4/2")]);
        let matrix = build_duel_matrix(&result, &ctx, Dataset::DuelloSezon).unwrap();

        assert_eq!(matrix.player_rows, vec!["b", "Zed"]);
        assert_eq!(matrix.cell("Zed", "b"), Some(DuelCell::new(4, 2)));
    }

    #[test]
    fn test_empty_result_gives_empty_matrix() {
        let matrix = build_duel_matrix(&result(vec![]), &context(), Dataset::DuelloSezon).unwrap();
        assert!(matrix.player_rows.is_empty());
        assert!(matrix.duels.is_empty());
    }
}
