//! Row normalization for raw SQL result sets.
//!
//! Query results arrive as a column list plus positional row tuples. The
//! [`ColumnIndex`] gives case-insensitive access by column name and coerces
//! cells to numbers, strings or ISO date keys with defaults, so the builders
//! never deal with nulls, numeric strings or driver-specific date encodings.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A raw result set: column names plus positional rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Build from string column names, mostly for fixtures.
    pub fn from_parts(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn index(&self) -> ColumnIndex {
        ColumnIndex::new(&self.columns)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Case-insensitive column name → position lookup.
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        let mut positions = HashMap::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            // First occurrence wins on duplicate names.
            positions
                .entry(column.as_ref().to_lowercase())
                .or_insert(i);
        }
        Self { positions }
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(&column.to_lowercase()).copied()
    }

    pub fn has(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    fn cell<'r>(&self, row: &'r [Value], column: &str) -> Option<&'r Value> {
        self.position(column)
            .and_then(|i| row.get(i))
            .filter(|v| !v.is_null())
    }

    /// Numeric cell, or `default` if the column is absent, the cell is null,
    /// or the value does not parse as a finite number.
    pub fn get(&self, row: &[Value], column: &str, default: f64) -> f64 {
        self.get_opt(row, column).unwrap_or(default)
    }

    /// Numeric cell, `None` where [`ColumnIndex::get`] would fall back.
    pub fn get_opt(&self, row: &[Value], column: &str) -> Option<f64> {
        self.cell(row, column).and_then(coerce_number)
    }

    /// Non-negative integer cell (counts), rounded.
    pub fn get_count(&self, row: &[Value], column: &str) -> u32 {
        let value = self.get(row, column, 0.0);
        if value <= 0.0 {
            0
        } else {
            value.round().min(u32::MAX as f64) as u32
        }
    }

    /// Text cell; numbers are rendered as text, null and absent yield `None`.
    pub fn get_str(&self, row: &[Value], column: &str) -> Option<String> {
        match self.cell(row, column)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Strict `YYYY-MM-DD` key of a date cell.
    pub fn date_key(&self, row: &[Value], column: &str) -> Option<String> {
        self.cell(row, column).and_then(iso_date_key)
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Normalize a raw date value to a strict `YYYY-MM-DD` key.
///
/// Accepts plain dates, dates followed by a time part (`T` or space
/// separated), RFC 3339 timestamps and epoch milliseconds. The time part is
/// dropped. Returns `None` for anything else.
pub fn iso_date_key(raw: &Value) -> Option<String> {
    let date = match raw {
        Value::String(s) => parse_date_prefix(s.trim())?,
        Value::Number(n) => {
            let millis = n.as_i64()?;
            DateTime::from_timestamp_millis(millis)?.date_naive()
        }
        _ => return None,
    };
    Some(date.format("%Y-%m-%d").to_string())
}

fn parse_date_prefix(s: &str) -> Option<NaiveDate> {
    let head = s.get(..10)?;
    let rest = &s[10..];
    if !(rest.is_empty() || rest.starts_with('T') || rest.starts_with(' ')) {
        return None;
    }
    // Zero-padded only: "2025-3-1" must not sneak through.
    let bytes = head.as_bytes();
    if bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Parse an ISO date key back into a date.
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    parse_date_prefix(key.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> QueryResult {
        QueryResult::from_parts(
            &["Steam_ID", "name", "KILLS", "adr", "match_date"],
            vec![
                vec![json!("7656"), json!("ace"), json!(21), json!("84.5"), json!("2025-03-01")],
                vec![json!("7657"), json!(null), json!("n/a"), json!(null), json!("garbage")],
            ],
        )
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let result = sample();
        let idx = result.index();
        assert_eq!(idx.position("steam_id"), Some(0));
        assert_eq!(idx.position("Kills"), Some(2));
        assert!(!idx.has("deaths"));
    }

    #[test]
    fn test_get_parses_numbers_and_numeric_strings() {
        let result = sample();
        let idx = result.index();
        let row = &result.rows[0];
        assert_eq!(idx.get(row, "kills", 0.0), 21.0);
        assert_eq!(idx.get(row, "adr", 0.0), 84.5);
    }

    #[test]
    fn test_get_falls_back_to_default() {
        let result = sample();
        let idx = result.index();
        let row = &result.rows[1];
        // unparseable
        assert_eq!(idx.get(row, "kills", -1.0), -1.0);
        // null
        assert_eq!(idx.get(row, "adr", 7.0), 7.0);
        // absent column
        assert_eq!(idx.get(row, "deaths", 0.0), 0.0);
        assert_eq!(idx.get_opt(row, "adr"), None);
    }

    #[test]
    fn test_short_row_does_not_panic() {
        let idx = ColumnIndex::new(&["a", "b"]);
        assert_eq!(idx.get(&[json!(1)], "b", 3.0), 3.0);
    }

    #[test]
    fn test_get_str() {
        let result = sample();
        let idx = result.index();
        assert_eq!(idx.get_str(&result.rows[0], "name").as_deref(), Some("ace"));
        assert_eq!(idx.get_str(&result.rows[0], "kills").as_deref(), Some("21"));
        assert_eq!(idx.get_str(&result.rows[1], "name"), None);
    }

    #[test]
    fn test_get_count_rounds_and_clamps() {
        let idx = ColumnIndex::new(&["n"]);
        assert_eq!(idx.get_count(&[json!(2.6)], "n"), 3);
        assert_eq!(idx.get_count(&[json!(-4)], "n"), 0);
    }

    #[test]
    fn test_iso_date_key_variants() {
        assert_eq!(iso_date_key(&json!("2025-03-01")).as_deref(), Some("2025-03-01"));
        assert_eq!(
            iso_date_key(&json!("2025-03-01T21:15:00Z")).as_deref(),
            Some("2025-03-01")
        );
        assert_eq!(
            iso_date_key(&json!("2025-03-01 21:15:00")).as_deref(),
            Some("2025-03-01")
        );
        assert_eq!(
            iso_date_key(&json!(1_740_787_200_000i64)).as_deref(),
            Some("2025-03-01")
        );
    }

    #[test]
    fn test_iso_date_key_rejects_garbage() {
        assert_eq!(iso_date_key(&json!("garbage")), None);
        assert_eq!(iso_date_key(&json!("2025-3-1")), None);
        assert_eq!(iso_date_key(&json!("2025-02-30")), None);
        assert_eq!(iso_date_key(&json!("2025-03-01xyz")), None);
        assert_eq!(iso_date_key(&json!(null)), None);
        assert_eq!(iso_date_key(&json!(true)), None);
    }

    #[test]
    fn test_date_key_from_row() {
        let result = sample();
        let idx = result.index();
        assert_eq!(
            idx.date_key(&result.rows[0], "match_date").as_deref(),
            Some("2025-03-01")
        );
        assert_eq!(idx.date_key(&result.rows[1], "match_date"), None);
    }

    #[test]
    fn test_parse_date_key() {
        assert_eq!(
            parse_date_key("2025-03-01"),
            NaiveDate::from_ymd_opt(2025, 3, 1)
        );
        assert_eq!(parse_date_key("01-03-2025"), None);
    }
}
