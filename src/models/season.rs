//! Selectable season windows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Id of the window spanning every observed night.
pub const ALL_TIME_WINDOW_ID: &str = "all";

/// A date range the dashboard can slice artifacts by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonWindow {
    pub id: String,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub is_current: bool,
}

impl SeasonWindow {
    /// Inclusive on both ends.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_contains_is_inclusive() {
        let window = SeasonWindow {
            id: "season-1".to_string(),
            label: "Season 1".to_string(),
            start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            is_current: false,
        };

        assert!(window.contains(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
        assert!(window.contains(NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()));
        assert!(!window.contains(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()));
        assert!(!window.contains(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
    }
}
