//! Season windows.
//!
//! Season start dates come from, in order of precedence:
//! - `season_starts.json` in the data dir
//! - the `SEASON_STARTS` environment variable (comma-separated dates)
//! - the configured defaults
//!
//! From the starts and the observed match dates this module derives the
//! selectable windows and slices date-keyed artifacts by them.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use tracing::warn;

use crate::models::{PerformanceSeries, SeasonWindow, ALL_TIME_WINDOW_ID};
use crate::normalize::parse_date_key;

/// Environment variable overriding the configured season starts.
pub const SEASON_STARTS_ENV: &str = "SEASON_STARTS";

/// Parse a comma-separated list of dates, skipping malformed entries.
pub fn parse_start_list(raw: &str) -> Vec<NaiveDate> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                warn!("Ignoring malformed season start '{}'", s);
                None
            }
        })
        .collect()
}

/// Pick the season starts by precedence. The first non-empty source wins.
/// The result is sorted and deduplicated.
pub fn resolve_season_starts(
    override_file: Option<Vec<NaiveDate>>,
    env_value: Option<&str>,
    defaults: &[NaiveDate],
) -> Vec<NaiveDate> {
    let mut starts = override_file
        .filter(|s| !s.is_empty())
        .or_else(|| env_value.map(parse_start_list).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| defaults.to_vec());
    starts.sort();
    starts.dedup();
    starts
}

/// Latest start on or before the latest observed date. Falls back to the
/// earliest start when nothing was observed after any start.
pub fn current_season_start(starts: &[NaiveDate], observed: &[NaiveDate]) -> Option<NaiveDate> {
    let earliest = starts.iter().min().copied();
    let Some(latest_observed) = observed.iter().max() else {
        return earliest;
    };
    starts
        .iter()
        .filter(|s| *s <= latest_observed)
        .max()
        .copied()
        .or(earliest)
}

/// One window per season with observed nights, plus the all-time window.
/// The latest season window is marked current.
pub fn build_windows(starts: &[NaiveDate], observed: &[NaiveDate]) -> Vec<SeasonWindow> {
    let (Some(&first_seen), Some(&last_seen)) = (observed.iter().min(), observed.iter().max())
    else {
        return Vec::new();
    };

    let mut starts = starts.to_vec();
    starts.sort();
    starts.dedup();

    let mut windows = Vec::new();
    for (i, &start) in starts.iter().enumerate() {
        let end = match starts.get(i + 1) {
            Some(next) => next.checked_sub_days(Days::new(1)).unwrap_or(*next),
            None => last_seen,
        };
        if !observed.iter().any(|d| *d >= start && *d <= end) {
            continue;
        }
        windows.push(SeasonWindow {
            id: format!("season-{}", i + 1),
            label: format!("Season {}", i + 1),
            start,
            end,
            is_current: false,
        });
    }

    if let Some(latest) = windows.last_mut() {
        latest.is_current = true;
    }

    windows.push(SeasonWindow {
        id: ALL_TIME_WINDOW_ID.to_string(),
        label: "All time".to_string(),
        start: first_seen,
        end: last_seen,
        is_current: false,
    });
    windows
}

pub fn find_window<'a>(windows: &'a [SeasonWindow], id: &str) -> Option<&'a SeasonWindow> {
    windows.iter().find(|w| w.id == id)
}

/// Keep the entries of a date-keyed artifact that fall inside `window`.
pub fn filter_by_window<V: Clone>(
    by_date: &BTreeMap<String, V>,
    window: &SeasonWindow,
) -> BTreeMap<String, V> {
    by_date
        .iter()
        .filter(|(key, _)| parse_date_key(key).is_some_and(|d| window.contains(d)))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Keep the points inside `window`; series left without points are dropped.
pub fn filter_series_by_window(
    series: &[PerformanceSeries],
    window: &SeasonWindow,
) -> Vec<PerformanceSeries> {
    series
        .iter()
        .filter_map(|s| {
            let performance: Vec<_> = s
                .performance
                .iter()
                .filter(|p| parse_date_key(&p.match_date).is_some_and(|d| window.contains(d)))
                .cloned()
                .collect();
            (!performance.is_empty()).then(|| PerformanceSeries {
                name: s.name.clone(),
                steam_id: s.steam_id.clone(),
                performance,
            })
        })
        .collect()
}
